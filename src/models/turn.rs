//! Turn Model
//!
//! One cycle of observing quiescence, consulting the agents and injecting a
//! command. Turns are built by the orchestrator, logged, and dropped.

use super::command::Command;
use super::update::{join_texts, Update};

/// A single decide-and-inject cycle
#[derive(Debug, Clone, Default)]
pub struct Turn {
    /// Zero-based turn counter
    pub index: u64,

    /// Updates observed since the previous turn
    pub updates: Vec<Update>,

    /// Command written this turn
    pub command: Option<Command>,

    /// Whether the narration decision fired
    pub narrated: bool,

    /// Whether a collaborator fell back to its default this turn
    pub used_fallback: bool,
}

impl Turn {
    /// Start a new turn from the updates gathered so far
    pub fn new(index: u64, updates: Vec<Update>) -> Self {
        Self {
            index,
            updates,
            ..Self::default()
        }
    }

    /// Game output of the turn as one block
    pub fn game_output(&self) -> String {
        join_texts(&self.updates)
    }

    /// Whether the last observed update is a continuation prompt
    pub fn ends_with_continuation(&self) -> bool {
        self.updates
            .iter()
            .rev()
            .find(|update| !update.is_blank())
            .is_some_and(Update::is_continuation)
    }
}
