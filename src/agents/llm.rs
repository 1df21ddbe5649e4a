//! LLM-backed collaborators
//!
//! [`LlmAgents`] implements all three collaborator traits over one
//! [`LlmClient`]. Every exchange is appended to the interaction log when one
//! is attached; a failure to log never fails the call.

use async_trait::async_trait;
use std::sync::Arc;

use super::client::LlmClient;
use super::parse::{parse_command_suggestion, parse_narration_decision};
use super::prompts::{self, COMMAND_AGENT, DECIDER_AGENT, NARRATOR_AGENT};
use super::{AgentError, CommandSuggester, NarrationDecider, Narrator, SuggestionRequest};
use crate::history::{InteractionLog, InteractionRecord};
use crate::models::{CommandSuggestion, JournalEntry, NarrationDecision};

pub struct LlmAgents<C> {
    client: C,
    interactions: Option<Arc<InteractionLog>>,
}

impl<C: LlmClient> LlmAgents<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            interactions: None,
        }
    }

    /// Record every exchange in `log`
    pub fn with_interaction_log(mut self, log: Arc<InteractionLog>) -> Self {
        self.interactions = Some(log);
        self
    }

    /// Send one prompt and record the exchange
    async fn exchange(&self, agent: &str, system: &str, prompt: &str) -> Result<String, AgentError> {
        let result = self.client.generate(system, prompt).await;

        if let Some(log) = &self.interactions {
            let response = match &result {
                Ok(text) => text.clone(),
                Err(e) => format!("error: {}", e),
            };
            if let Err(e) = log.append(agent, InteractionRecord::new(system, prompt, &response)) {
                warn!("Failed to record {} interaction: {}", agent, e);
            }
        }

        result
    }
}

#[async_trait]
impl<C: LlmClient> CommandSuggester for LlmAgents<C> {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<CommandSuggestion, AgentError> {
        let prompt = prompts::command_prompt(&request.transcript, request.awaiting_keypress);
        let response = self
            .exchange(COMMAND_AGENT, prompts::COMMAND_SYSTEM, &prompt)
            .await?;
        parse_command_suggestion(&response)
    }
}

#[async_trait]
impl<C: LlmClient> NarrationDecider for LlmAgents<C> {
    async fn decide(&self, recent: &[JournalEntry]) -> Result<NarrationDecision, AgentError> {
        let prompt = prompts::decision_prompt(recent);
        let response = self
            .exchange(DECIDER_AGENT, prompts::DECIDER_SYSTEM, &prompt)
            .await?;
        parse_narration_decision(&response)
    }
}

#[async_trait]
impl<C: LlmClient> Narrator for LlmAgents<C> {
    async fn narrate(&self, previous: &str, events: &str) -> Result<String, AgentError> {
        let prompt = prompts::narration_prompt(previous, events);
        let response = self
            .exchange(NARRATOR_AGENT, prompts::NARRATOR_SYSTEM, &prompt)
            .await?;
        Ok(response.trim().to_string())
    }
}
