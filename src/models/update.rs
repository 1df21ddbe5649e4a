//! Update Model
//!
//! One segmented unit of game output. An update ends at a newline, at the
//! continuation marker, or at a forced flush of the pending buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What closed an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    /// A `\n` was consumed; it is not part of the text
    Newline,
    /// The text ends with the continuation marker
    Continuation,
    /// Pending text was flushed on quiescence or end of stream
    Flush,
}

impl Terminator {
    /// Bytes that must be re-appended to the text to reproduce the stream
    pub fn suffix(&self) -> &'static str {
        match self {
            Terminator::Newline => "\n",
            Terminator::Continuation | Terminator::Flush => "",
        }
    }
}

/// A discrete, ordered unit of game output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic position in the session's output
    pub sequence: u64,

    /// When the terminating boundary was observed
    pub timestamp: DateTime<Utc>,

    /// Decoded text exactly as received, without a consumed newline
    pub raw: String,

    /// Boundary that closed this update
    pub terminator: Terminator,
}

impl Update {
    /// Create a new update stamped with the current time
    pub fn new(sequence: u64, raw: String, terminator: Terminator) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            raw,
            terminator,
        }
    }

    /// Text with the terminal's trailing carriage return removed
    pub fn text(&self) -> &str {
        self.raw.trim_end_matches('\r')
    }

    /// Whether the update carries no visible content
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Whether the game is asking for a keypress before continuing
    pub fn is_continuation(&self) -> bool {
        self.terminator == Terminator::Continuation
    }
}

/// Join update texts into a newline separated block
pub fn join_texts(updates: &[Update]) -> String {
    updates
        .iter()
        .map(Update::text)
        .collect::<Vec<_>>()
        .join("\n")
}
