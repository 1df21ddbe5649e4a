//! Turn boundary detection
//!
//! Decides when the game is presumed to be waiting for a command. The
//! orchestrator only asks "is this a boundary?" after a poll timed out, so
//! implementations never see a cycle in which data was still arriving.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::{BoundaryKind, PtyConfig};

/// Predicate deciding when a turn has ended
pub trait TurnBoundary: Send {
    /// Record that output was received
    fn record_output(&mut self);

    /// Whether the turn ended, given the text still waiting in the segmenter
    fn is_turn_boundary(&self, pending: &str) -> bool;

    /// Restart the timer after a command was written
    fn reset(&mut self);

    /// Time since the last output or reset
    fn idle_duration(&self) -> Duration;
}

/// Declares a boundary once nothing was received for longer than a threshold
#[derive(Debug, Clone)]
pub struct QuiescenceBoundary {
    threshold: Duration,
    last_output: Instant,
}

impl QuiescenceBoundary {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_output: Instant::now(),
        }
    }

    /// The configured quiet period
    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl TurnBoundary for QuiescenceBoundary {
    fn record_output(&mut self) {
        self.last_output = Instant::now();
    }

    fn is_turn_boundary(&self, _pending: &str) -> bool {
        self.last_output.elapsed() > self.threshold
    }

    fn reset(&mut self) {
        self.last_output = Instant::now();
    }

    fn idle_duration(&self) -> Duration {
        self.last_output.elapsed()
    }
}

/// Shortens the quiet period when the pending text ends with a prompt.
///
/// Games print their input prompt without a newline, so it is still sitting
/// in the segmenter when the game blocks. Without a visible prompt this
/// behaves exactly like [`QuiescenceBoundary`].
#[derive(Debug, Clone)]
pub struct PromptBoundary {
    pattern: String,
    prompt_quiet: Duration,
    fallback: QuiescenceBoundary,
}

impl PromptBoundary {
    pub fn new(pattern: impl Into<String>, prompt_quiet: Duration, threshold: Duration) -> Self {
        Self {
            pattern: pattern.into(),
            prompt_quiet,
            fallback: QuiescenceBoundary::new(threshold),
        }
    }

    fn shows_prompt(&self, pending: &str) -> bool {
        let pattern = self.pattern.trim();
        !pattern.is_empty() && pending.trim_end().ends_with(pattern)
    }
}

impl TurnBoundary for PromptBoundary {
    fn record_output(&mut self) {
        self.fallback.record_output();
    }

    fn is_turn_boundary(&self, pending: &str) -> bool {
        if self.shows_prompt(pending) {
            return self.fallback.idle_duration() > self.prompt_quiet;
        }
        self.fallback.is_turn_boundary(pending)
    }

    fn reset(&mut self) {
        self.fallback.reset();
    }

    fn idle_duration(&self) -> Duration {
        self.fallback.idle_duration()
    }
}

/// Build the boundary strategy selected in the configuration
pub fn from_config(config: &PtyConfig) -> Box<dyn TurnBoundary> {
    let threshold = Duration::from_millis(config.quiescence_ms);
    match config.boundary {
        BoundaryKind::Quiescence => Box::new(QuiescenceBoundary::new(threshold)),
        BoundaryKind::Prompt => Box::new(PromptBoundary::new(
            config.prompt_pattern.clone(),
            Duration::from_millis(config.prompt_quiet_ms),
            threshold,
        )),
    }
}
