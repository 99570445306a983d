//! Signoria -- a turn adjudicator for Machiavelli-style games.
//!
//! Reads one JSON request per stdin line and writes one JSON response per
//! stdout line. Diagnostics go to stderr.
//!
//! Usage:
//!   signoria [--map FILE] [--verbose]
//!
//! Options:
//!   --map FILE   Board definition in JSON (default: the bundled Tuscany map)
//!   --verbose    Log each pipeline stage to stderr

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use signoria::board::{maps, Board};
use signoria::engine::{Engine, Reply};

fn print_usage() {
    eprintln!("Usage: signoria [--map FILE] [--verbose]");
}

fn load_board(path: Option<&str>) -> Result<Board, String> {
    match path {
        Some(p) => {
            let json = fs::read_to_string(p).map_err(|e| format!("cannot read {}: {}", p, e))?;
            Board::from_json(&json).map_err(|e| format!("invalid map {}: {}", p, e))
        }
        None => maps::tuscany().map_err(|e| format!("bundled map is invalid: {}", e)),
    }
}

fn run(engine: &mut Engine) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match engine.handle_line(&line) {
            Reply::Send(response) => {
                let json = serde_json::to_string(&response)?;
                writeln!(out, "{}", json)?;
                out.flush()?;
            }
            Reply::Quit => break,
        }
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut map_path: Option<String> = None;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--map" => {
                i += 1;
                match args.get(i) {
                    Some(p) => map_path = Some(p.clone()),
                    None => {
                        eprintln!("--map needs a file");
                        process::exit(1);
                    }
                }
            }
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let board = match load_board(map_path.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    log::info!("loaded map with {} areas", board.len());

    let mut engine = Engine::new(board);
    if let Err(e) = run(&mut engine) {
        eprintln!("i/o error: {}", e);
        process::exit(1);
    }
}
