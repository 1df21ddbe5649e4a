//! Agent collaborators
//!
//! The turn loop consults three collaborators: one picks the next command,
//! one decides whether the story log should grow, one writes the narration.
//! They are reached through an explicit [`AgentContext`] so the loop never
//! touches shared global state and can run against fakes.

pub mod client;
pub mod llm;
pub mod parse;
pub mod prompts;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CommandSuggestion, JournalEntry, NarrationDecision};
use crate::speech::SpeechSink;

pub use client::{GeminiClient, LlmClient};
pub use llm::LlmAgents;
pub use parse::{extract_json, parse_command_suggestion, parse_narration_decision};

/// Failure of a single agent call
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Agent returned an empty response")]
    EmptyResponse,

    #[error("Malformed agent response: {0}")]
    MalformedResponse(String),

    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("Agent call timed out after {0:?}")]
    Timeout(Duration),
}

/// What the command agent sees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionRequest {
    /// Cleaned game log, oldest first
    pub transcript: String,
    /// The game is showing a continuation prompt
    pub awaiting_keypress: bool,
}

/// Picks the next command
#[async_trait]
pub trait CommandSuggester: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<CommandSuggestion, AgentError>;
}

/// Judges whether the recent turns deserve a narration
#[async_trait]
pub trait NarrationDecider: Send + Sync {
    async fn decide(&self, recent: &[JournalEntry]) -> Result<NarrationDecision, AgentError>;
}

/// Writes narration for newly observed events
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Returns free text; blank output means there is nothing to narrate
    async fn narrate(&self, previous: &str, events: &str) -> Result<String, AgentError>;
}

/// Collaborators and limits for one run of the turn loop
#[derive(Clone)]
pub struct AgentContext {
    pub suggester: Arc<dyn CommandSuggester>,
    pub decider: Arc<dyn NarrationDecider>,
    pub narrator: Arc<dyn Narrator>,
    /// Speaks narrations when present
    pub speech: Option<Arc<dyn SpeechSink>>,
    /// Upper bound on each agent call
    pub call_timeout: Duration,
    /// Command injected when the suggester fails
    pub default_command: String,
}

impl AgentContext {
    /// Use one implementation for all three collaborators
    pub fn from_agents<A>(agents: Arc<A>, call_timeout: Duration, default_command: &str) -> Self
    where
        A: CommandSuggester + NarrationDecider + Narrator + 'static,
    {
        Self {
            suggester: agents.clone(),
            decider: agents.clone(),
            narrator: agents,
            speech: None,
            call_timeout,
            default_command: default_command.to_string(),
        }
    }

    pub fn with_speech(mut self, speech: Option<Arc<dyn SpeechSink>>) -> Self {
        self.speech = speech;
        self
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("speech", &self.speech.is_some())
            .field("call_timeout", &self.call_timeout)
            .field("default_command", &self.default_command)
            .finish_non_exhaustive()
    }
}
