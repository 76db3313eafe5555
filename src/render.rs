//! Terminal output for snapshot sequences.

use std::io::{self, Write};

use clap::ValueEnum;
use colored::*;

use crate::assembler::{AssemblerState, StreamSnapshot};

/// Shown when a stream ends without producing any text.
pub const FALLBACK_MESSAGE: &str = "could not complete the request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Print only the newly appended text of each snapshot.
    Live,
    /// Print every snapshot in full on its own line.
    Lines,
    /// One JSON object per snapshot.
    Json,
}

/// Writes snapshots to a terminal (or any writer) as they arrive.
pub struct SnapshotRenderer {
    format: OutputFormat,
    printed: usize,
    rendered: usize,
}

impl SnapshotRenderer {
    pub fn new(format: OutputFormat) -> Self {
        SnapshotRenderer {
            format,
            printed: 0,
            rendered: 0,
        }
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn header<W: Write>(&self, out: &mut W, label: &str, echo: &str) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return Ok(());
        }
        writeln!(out, "{}: {}", label.bright_yellow(), echo)?;
        writeln!(out, "{}", "=".repeat(50).bright_blue())
    }

    pub fn render<W: Write>(&mut self, out: &mut W, snapshot: &StreamSnapshot) -> io::Result<()> {
        match self.format {
            OutputFormat::Live => {
                // Snapshots only grow, so the unseen part is a suffix.
                match snapshot.text.get(self.printed..) {
                    Some(delta) => write!(out, "{}", delta)?,
                    None => write!(out, "\n{}", snapshot.text)?,
                }
            }
            OutputFormat::Lines => {
                writeln!(out, "{} {}", format!("[{}]", snapshot.sequence).dimmed(), snapshot.text)?;
            }
            OutputFormat::Json => {
                let line = serde_json::to_string(snapshot)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(out, "{}", line)?;
            }
        }
        self.printed = snapshot.text.len();
        self.rendered += 1;
        out.flush()
    }

    pub fn footer<W: Write>(&self, out: &mut W, state: AssemblerState) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            if self.rendered == 0 {
                writeln!(out, "{}", serde_json::json!({ "error": FALLBACK_MESSAGE, "state": state }))?;
            }
            return Ok(());
        }
        if self.format == OutputFormat::Live && self.rendered > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", "=".repeat(50).bright_blue())?;
        if self.rendered == 0 {
            writeln!(out, "{}", FALLBACK_MESSAGE.bright_red())?;
            return Ok(());
        }
        match state {
            AssemblerState::Completed => writeln!(out, "Complete! {} snapshots, {} bytes.", self.rendered, self.printed),
            AssemblerState::Cancelled => writeln!(out, "{}", "Cancelled.".bright_yellow()),
            other => writeln!(out, "{}", format!("Stream ended: {}", other).bright_red()),
        }
    }
}
