//! Integration tests for the signoria binary.
//!
//! Spawns the adjudicator, feeds it JSON request lines on stdin and checks the
//! JSON response lines it writes to stdout.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use serde_json::Value;

/// Sends a sequence of request lines and collects the parsed responses.
fn run_engine(requests: &[&str]) -> Vec<Value> {
    let exe = env!("CARGO_BIN_EXE_signoria");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start signoria");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for req in requests {
        writeln!(stdin, "{}", req).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<Value> = reader
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).expect("response is not JSON"))
        .collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

/// A FLO (18) and A ARE (20) for player 1 against A SIE (19) for player 2.
const LOAD: &str = r#"{"command":"load","units":[{"id":1,"player":1,"unit_type":"army","area":18},{"id":2,"player":1,"unit_type":"army","area":20},{"id":3,"player":2,"unit_type":"army","area":19}]}"#;

#[test]
fn load_reports_unit_count() {
    let out = run_engine(&[LOAD, r#"{"command":"quit"}"#]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["kind"], "loaded");
    assert_eq!(out[0]["units"], 3);
}

#[test]
fn supported_attack_dislodges() {
    let out = run_engine(&[
        LOAD,
        r#"{"command":"adjudicate","notation":"A FLO - SIE; A ARE S A FLO - SIE"}"#,
        r#"{"command":"position"}"#,
        r#"{"command":"quit"}"#,
    ]);
    assert_eq!(out.len(), 3);
    assert_eq!(out[1]["kind"], "adjudicated");
    let reqs = out[1]["retreat_requirements"].as_array().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0]["unit"], 3);
    assert_eq!(reqs[0]["forbidden"], 18);

    assert_eq!(out[2]["kind"], "position");
    let units: Vec<&str> = out[2]["units"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(units, ["A SIE", "A ARE", "A SIE (dislodged from FLO)"]);
}

#[test]
fn equal_swap_bounces() {
    let out = run_engine(&[
        LOAD,
        r#"{"command":"adjudicate","notation":"A FLO - SIE; A SIE - FLO; A ARE H"}"#,
    ]);
    // Head-to-head with equal strength: both stay.
    assert_eq!(out[1]["kind"], "adjudicated");
    assert!(out[1]["retreat_requirements"].as_array().unwrap().is_empty());
    let after = out[1]["units_after"].as_array().unwrap();
    assert_eq!(after[0]["area"], 18);
    assert_eq!(after[2]["area"], 19);
}

#[test]
fn retreat_session() {
    let out = run_engine(&[
        LOAD,
        r#"{"command":"adjudicate","notation":"A FLO - SIE; A ARE S A FLO - SIE"}"#,
        r#"{"command":"retreat_options","unit":3}"#,
        r#"{"command":"retreat","choices":[{"unit":3,"destination":21}]}"#,
        r#"{"command":"position"}"#,
    ]);
    assert_eq!(out[2]["kind"], "retreat_options");
    assert!(out[2]["options"].as_array().unwrap().iter().any(|o| o["area"] == 21));
    assert_eq!(out[3]["kind"], "retreated");
    let units: Vec<&str> = out[4]["units"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(units, ["A SIE", "A ARE", "A PER"]);
}

#[test]
fn bad_lines_get_error_responses() {
    let out = run_engine(&[
        "not json",
        r#"{"command":"dance"}"#,
        LOAD,
        r#"{"command":"adjudicate","notation":"A NAP H"}"#,
    ]);
    assert_eq!(out.len(), 4);
    assert_eq!(out[0]["kind"], "error");
    assert_eq!(out[1]["kind"], "error");
    assert_eq!(out[2]["kind"], "loaded");
    assert_eq!(out[3]["kind"], "error");
}

#[test]
fn blank_lines_are_skipped() {
    let out = run_engine(&["", "   ", r#"{"command":"position"}"#]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["units"].as_array().unwrap().len(), 0);
}

#[test]
fn missing_map_file_exits_with_failure() {
    let exe = env!("CARGO_BIN_EXE_signoria");
    let status = Command::new(exe)
        .args(["--map", "/nonexistent/map.json"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to start signoria");
    assert!(!status.success());
}
