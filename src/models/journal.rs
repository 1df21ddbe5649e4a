//! Journal Model
//!
//! Records stored in the structured session journal, plus the typed
//! results the agents return.

use serde::{Deserialize, Serialize};

/// Command chosen by the suggestion agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSuggestion {
    /// Command text, `ENTER` for a bare newline
    pub command: String,
    /// Why the agent picked it
    pub explanation: String,
}

impl CommandSuggestion {
    /// Safe observation command used whenever the agent fails
    pub fn fallback(default_command: &str, reason: impl Into<String>) -> Self {
        Self {
            command: default_command.to_string(),
            explanation: reason.into(),
        }
    }
}

/// Whether the story should be narrated this turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationDecision {
    pub should_update: bool,
    pub reason: String,
}

impl NarrationDecision {
    /// "No narration" decision used whenever the agent fails
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            should_update: false,
            reason: reason.into(),
        }
    }
}

/// One record in the session journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Local wall clock, `HH:MM:SS.mmm`
    pub timestamp: String,

    /// Game output observed since the previous turn
    pub game_output: String,

    /// Whether a narration was written for this entry
    pub story_updated: bool,

    /// Command the agent chose in response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_action: Option<CommandSuggestion>,
}

impl JournalEntry {
    /// Create an entry without an action
    pub fn new(timestamp: String, game_output: String) -> Self {
        Self {
            timestamp,
            game_output,
            story_updated: false,
            agent_action: None,
        }
    }
}
