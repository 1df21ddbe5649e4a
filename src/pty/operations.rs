//! Game Terminal Abstraction
//!
//! The orchestrator drives the game through this trait rather than through
//! [`PtySession`](super::PtySession) directly, so the turn loop can run
//! against a scripted double in tests.

use crate::error::Result;
use crate::models::{Command, Update};
use async_trait::async_trait;
use std::time::Duration;

/// What one readiness-bounded poll produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollResult {
    /// Updates completed by the bytes read in this poll
    pub updates: Vec<Update>,
    /// Number of bytes read
    pub received: usize,
    /// The interpreter closed its end of the terminal
    pub eof: bool,
}

impl PollResult {
    /// No data arrived before the deadline and the stream is still open
    pub fn timed_out(&self) -> bool {
        self.received == 0 && !self.eof
    }
}

/// Operations the turn loop needs from a running game
#[async_trait]
pub trait GameTerminal: Send {
    /// Wait up to `timeout` for output and segment whatever arrives
    ///
    /// # Errors
    /// Returns an error only for descriptor-level failures; end of stream is
    /// reported through [`PollResult::eof`].
    async fn poll(&mut self, timeout: Duration) -> Result<PollResult>;

    /// Emit the segmenter's pending text as a final update
    fn flush_pending(&mut self, force: bool) -> Option<Update>;

    /// Text received but not yet closed by a boundary
    fn pending_text(&self) -> &str;

    /// Write one command to the game's standard input
    ///
    /// # Errors
    /// Fails when the session is not alive or the write itself fails.
    async fn inject(&mut self, command: &Command) -> Result<()>;

    /// Stop the game and release the terminal. Calling it again is a no-op.
    async fn quit(&mut self) -> Result<()>;

    /// Whether commands can still be written
    fn is_alive(&self) -> bool;
}
