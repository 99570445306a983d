//! The adjudication log.
//!
//! Every run returns a deterministic trace of its decisions, one line per
//! order outcome, tagged with the pipeline stage that produced it. The
//! `Display` rendering (`[stage] message`) is stable and used as golden output
//! in tests. Warnings and errors are mirrored to the `log` facade.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage that emitted a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocess,
    Conversions,
    Supports,
    Convoys,
    Reachability,
    Conflicts,
    Orders,
    Sieges,
    Announce,
    Retreats,
}

impl Stage {
    /// Returns the short name used in rendered log lines.
    pub const fn name(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Conversions => "conversions",
            Stage::Supports => "supports",
            Stage::Convoys => "convoys",
            Stage::Reachability => "reachability",
            Stage::Conflicts => "conflicts",
            Stage::Orders => "orders",
            Stage::Sieges => "sieges",
            Stage::Announce => "announce",
            Stage::Retreats => "retreats",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// One decision recorded by the adjudicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub stage: Stage,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Ordered list of log lines for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjudicationLog {
    lines: Vec<LogLine>,
}

impl AdjudicationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, stage: Stage, level: Level, message: String) {
        self.lines.push(LogLine { stage, level, message });
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Level::Info, message.into());
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        log::warn!("[{}] {}", stage, message);
        self.push(stage, Level::Warn, message);
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        log::error!("[{}] {}", stage, message);
        self.push(stage, Level::Error, message);
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterates over the lines of one stage.
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().filter(move |l| l.stage == stage)
    }

    /// Returns true if any line contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.message.contains(needle))
    }
}

impl fmt::Display for AdjudicationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
