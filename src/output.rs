use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::{BuildSummary, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
    Quiet,
}

/// Prints stage progress to stdout as it happens.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &BuildSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Swallows progress; errors still reach stderr.
pub struct QuietOutput;

impl ProgressSink for QuietOutput {
    fn event(&self, _event: ProgressEvent) {}
}
