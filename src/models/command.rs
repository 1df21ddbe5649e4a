//! Command Model
//!
//! A line destined for the game's standard input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keyword that maps to a bare newline
pub const ENTER_KEYWORD: &str = "ENTER";

/// Command written to the interpreter once per turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Command {
    /// Send a lone newline (answers `***MORE***` and similar keypress prompts)
    Enter,
    /// Send a trimmed line of text
    Line(String),
}

impl Command {
    /// Resolve a suggested command string.
    ///
    /// `ENTER` in any case and empty input both become [`Command::Enter`].
    /// Embedded line breaks are folded into spaces so one turn never
    /// writes more than one line.
    pub fn parse(input: &str) -> Self {
        let folded: String = input
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let trimmed = folded.trim();

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ENTER_KEYWORD) {
            Command::Enter
        } else {
            Command::Line(trimmed.to_string())
        }
    }

    /// Bytes to write to the PTY master
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Command::Enter => b"\n".to_vec(),
            Command::Line(text) => {
                let mut bytes = Vec::with_capacity(text.len() + 1);
                bytes.extend_from_slice(text.as_bytes());
                bytes.push(b'\n');
                bytes
            }
        }
    }

    /// Text as shown to the operator and written to the logs
    pub fn display_text(&self) -> &str {
        match self {
            Command::Enter => ENTER_KEYWORD,
            Command::Line(text) => text,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}
