use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{ProcessSummary, ProgressEvent, ProgressSink};

/// Forwards progress events to the log, which the CLI routes to stderr.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => info!("{}", event.message),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &ProcessSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    /// Summaries go to stderr; stdout carries the annotated table.
    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stderr = io::stderr().lock();
        stderr.write_all(json.as_bytes())?;
        stderr.write_all(b"\n")?;
        Ok(())
    }
}
