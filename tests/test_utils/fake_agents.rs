//! Fake agents
//!
//! [`ScriptedAgents`] plays all three collaborators with fixed answers,
//! [`HeldSuggester`] blocks until released, and [`CannedClient`] feeds raw
//! replies through the real prompt and parsing code in `LlmAgents`.

use async_trait::async_trait;
use fiction_pilot::agents::{
    AgentError, CommandSuggester, LlmClient, NarrationDecider, Narrator, SuggestionRequest,
};
use fiction_pilot::models::{CommandSuggestion, JournalEntry, NarrationDecision};
use fiction_pilot::speech::SpeechSink;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Answers every call from a script
pub struct ScriptedAgents {
    commands: Mutex<VecDeque<String>>,
    should_update: bool,
    narration: String,
    suggest_calls: AtomicUsize,
    decide_calls: AtomicUsize,
    requests: Mutex<Vec<SuggestionRequest>>,
    decision_windows: Mutex<Vec<usize>>,
    narration_inputs: Mutex<Vec<(String, String)>>,
}

impl ScriptedAgents {
    /// Suggest `commands` in order, then `look`; never narrate
    pub fn new(commands: &[&str]) -> Self {
        Self {
            commands: Mutex::new(commands.iter().map(|c| c.to_string()).collect()),
            should_update: false,
            narration: String::new(),
            suggest_calls: AtomicUsize::new(0),
            decide_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            decision_windows: Mutex::new(Vec::new()),
            narration_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Decide to narrate every turn and reply with `narration`
    pub fn narrating(mut self, narration: &str) -> Self {
        self.should_update = true;
        self.narration = narration.to_string();
        self
    }

    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    pub fn decide_calls(&self) -> usize {
        self.decide_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SuggestionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// How many journal entries the decider saw on each call
    pub fn decision_windows(&self) -> Vec<usize> {
        self.decision_windows.lock().unwrap().clone()
    }

    /// `(previous, events)` passed to the narrator on each call
    pub fn narration_inputs(&self) -> Vec<(String, String)> {
        self.narration_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSuggester for ScriptedAgents {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<CommandSuggestion, AgentError> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let command = self
            .commands
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "look".to_string());
        Ok(CommandSuggestion {
            command,
            explanation: "scripted".to_string(),
        })
    }
}

#[async_trait]
impl NarrationDecider for ScriptedAgents {
    async fn decide(&self, recent: &[JournalEntry]) -> Result<NarrationDecision, AgentError> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        self.decision_windows.lock().unwrap().push(recent.len());
        Ok(NarrationDecision {
            should_update: self.should_update,
            reason: "scripted".to_string(),
        })
    }
}

#[async_trait]
impl Narrator for ScriptedAgents {
    async fn narrate(&self, previous: &str, events: &str) -> Result<String, AgentError> {
        self.narration_inputs
            .lock()
            .unwrap()
            .push((previous.to_string(), events.to_string()));
        Ok(self.narration.clone())
    }
}

/// Suggester that waits for [`HeldSuggester::release`] before answering
pub struct HeldSuggester {
    command: String,
    gate: Notify,
    calls: AtomicUsize,
}

impl HeldSuggester {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandSuggester for HeldSuggester {
    async fn suggest(&self, _request: &SuggestionRequest) -> Result<CommandSuggestion, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(CommandSuggestion {
            command: self.command.clone(),
            explanation: "released".to_string(),
        })
    }
}

/// Backend that returns the same raw text for every prompt
pub struct CannedClient {
    reply: String,
}

impl CannedClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for CannedClient {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, AgentError> {
        Ok(self.reply.clone())
    }
}

/// Speech sink that remembers what it was asked to say
#[derive(Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeech {
    async fn speak(&self, text: &str) -> fiction_pilot::Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
