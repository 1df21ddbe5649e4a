//! Core data models for fiction-pilot
//!
//! This module contains the data structures shared by the segmenter,
//! the PTY controller, the orchestrator and the persistence sink.

pub mod command;
pub mod game_process;
pub mod journal;
pub mod turn;
pub mod update;

// Re-exports for convenience
pub use command::Command;
pub use game_process::{GameProcess, ProcessState};
pub use journal::{CommandSuggestion, JournalEntry, NarrationDecision};
pub use turn::Turn;
pub use update::{Terminator, Update};
