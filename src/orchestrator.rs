//! Turn orchestration
//!
//! Drives the session through a small state machine:
//!
//! ```text
//! Reading --boundary--> Deciding --> Injecting --> Reading
//!    |                     |             |
//!    +--------eof / error / interrupt----+--> Draining --> Closed
//! ```
//!
//! While Reading, every update is persisted and echoed as soon as it is
//! segmented. A turn ends only after a poll saw no data and the boundary
//! reports quiescence; then the command and narration agents are consulted
//! concurrently, a command is written, and the boundary timer restarts.
//! At most one command is ever in flight.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::agents::prompts::is_empty_narration;
use crate::agents::{AgentContext, AgentError, SuggestionRequest};
use crate::config::Config;
use crate::console::Console;
use crate::error::Result;
use crate::history::SessionLogs;
use crate::models::{Command, CommandSuggestion, NarrationDecision, Turn, Update};
use crate::pty::GameTerminal;
use crate::terminal::TurnBoundary;

/// Where the turn loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Reading,
    Deciding,
    Injecting,
    Draining,
    Closed,
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The game closed its output
    EndOfStream,
    /// The operator asked to stop
    Interrupted,
    /// Reading from or writing to the game failed
    TerminalError(String),
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub turns: u64,
    pub updates: u64,
    pub narrations: u64,
    pub fallbacks: u64,
    pub exit_reason: ExitReason,
}

/// Loop timing and context sizes
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Upper bound on a single poll
    pub poll_interval: Duration,
    /// Journal entries shown to the narration decider
    pub decision_window: usize,
    /// Previous narrations shown to the narrator
    pub narration_context: usize,
    /// Game log lines shown to the command agent
    pub transcript_lines: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            decision_window: 3,
            narration_context: 3,
            transcript_lines: 400,
        }
    }
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            decision_window: config.agents.decision_window,
            narration_context: config.agents.narration_context,
            transcript_lines: config.agents.transcript_lines,
        }
    }
}

/// Owns one game session and runs it to completion
pub struct TurnOrchestrator<T> {
    terminal: T,
    boundary: Box<dyn TurnBoundary>,
    agents: AgentContext,
    logs: SessionLogs,
    console: Box<dyn Console>,
    settings: LoopSettings,
    state: LoopState,
    /// Updates observed since the last injected command
    turn_updates: Vec<Update>,
    /// Command chosen in Deciding, written in Injecting
    next_command: Option<Command>,
    turns: u64,
    updates: u64,
    narrations: u64,
    fallbacks: u64,
    exit_reason: Option<ExitReason>,
}

impl<T: GameTerminal> TurnOrchestrator<T> {
    pub fn new(
        terminal: T,
        boundary: Box<dyn TurnBoundary>,
        agents: AgentContext,
        logs: SessionLogs,
        console: Box<dyn Console>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            terminal,
            boundary,
            agents,
            logs,
            console,
            settings,
            state: LoopState::Reading,
            turn_updates: Vec::new(),
            next_command: None,
            turns: 0,
            updates: 0,
            narrations: 0,
            fallbacks: 0,
            exit_reason: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn logs(&self) -> &SessionLogs {
        &self.logs
    }

    /// Run until the game exits, the terminal fails, or `shutdown` turns true.
    ///
    /// The game process is shut down on every exit path.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<RunSummary> {
        info!("🎲 Turn loop started");

        while self.state != LoopState::Closed {
            if *shutdown.borrow() && self.exit_reason.is_none() {
                info!("Shutdown requested, draining session");
                self.stop(ExitReason::Interrupted);
            }

            match self.state {
                LoopState::Reading => self.read_cycle().await,
                LoopState::Deciding => {
                    tokio::select! {
                        command = self.decide() => {
                            self.next_command = Some(command);
                            self.transition(LoopState::Injecting);
                        }
                        _ = shutdown_requested(&mut shutdown) => {
                            self.stop(ExitReason::Interrupted);
                        }
                    }
                }
                LoopState::Injecting => self.inject(&mut shutdown).await,
                LoopState::Draining => self.drain(),
                LoopState::Closed => {}
            }
        }

        if let Err(e) = self.terminal.quit().await {
            warn!("Failed to shut down game: {}", e);
        }

        let summary = RunSummary {
            turns: self.turns,
            updates: self.updates,
            narrations: self.narrations,
            fallbacks: self.fallbacks,
            exit_reason: self
                .exit_reason
                .clone()
                .unwrap_or(ExitReason::EndOfStream),
        };
        info!(
            "🏁 Session ended after {} turns ({:?})",
            summary.turns, summary.exit_reason
        );
        Ok(summary)
    }

    fn transition(&mut self, next: LoopState) {
        debug!("Turn loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Record the exit reason once and head for Draining
    fn stop(&mut self, reason: ExitReason) {
        if self.exit_reason.is_none() {
            self.exit_reason = Some(reason);
        }
        self.next_command = None;
        self.transition(LoopState::Draining);
    }

    async fn read_cycle(&mut self) {
        let poll = match self.terminal.poll(self.settings.poll_interval).await {
            Ok(poll) => poll,
            Err(e) => {
                error!("Reading game output failed: {}", e);
                self.stop(ExitReason::TerminalError(e.to_string()));
                return;
            }
        };

        let timed_out = poll.timed_out();
        if poll.received > 0 {
            self.boundary.record_output();
        }
        for update in poll.updates {
            self.observe(update);
        }

        if poll.eof {
            info!("Game output closed");
            self.stop(ExitReason::EndOfStream);
        } else if timed_out && self.boundary.is_turn_boundary(self.terminal.pending_text()) {
            self.transition(LoopState::Deciding);
        }
    }

    /// Persist, echo, and collect one update
    fn observe(&mut self, update: Update) {
        if let Err(e) = self.logs.append_update(&update) {
            warn!("Failed to log game output: {}", e);
        }
        self.console.show_update(&update);
        self.updates += 1;
        self.turn_updates.push(update);
    }

    /// Close the current turn and pick the next command.
    ///
    /// Never fails: every collaborator error is replaced by its fallback.
    async fn decide(&mut self) -> Command {
        if let Some(update) = self.terminal.flush_pending(true) {
            self.observe(update);
        }

        let mut turn = Turn::new(self.turns, std::mem::take(&mut self.turn_updates));
        self.turns += 1;
        let game_output = turn.game_output();
        debug!(
            "Turn {} closed with {} updates",
            turn.index,
            turn.updates.len()
        );

        if let Err(e) = self.logs.record_turn(&game_output) {
            warn!("Failed to write journal entry: {}", e);
        }

        let transcript = self
            .logs
            .transcript(self.settings.transcript_lines)
            .unwrap_or_else(|e| {
                warn!("Failed to read game log, using this turn only: {}", e);
                game_output.clone()
            });
        let request = SuggestionRequest {
            transcript,
            awaiting_keypress: turn.ends_with_continuation(),
        };
        let recent = self.logs.recent_entries(self.settings.decision_window).to_vec();

        let timeout = self.agents.call_timeout;
        let suggester = self.agents.suggester.clone();
        let decider = self.agents.decider.clone();
        let (suggestion, decision) = tokio::join!(
            with_timeout(timeout, suggester.suggest(&request)),
            with_timeout(timeout, decider.decide(&recent)),
        );

        let suggestion = suggestion.unwrap_or_else(|e| {
            warn!("Command agent failed, using '{}': {}", self.agents.default_command, e);
            turn.used_fallback = true;
            CommandSuggestion::fallback(
                &self.agents.default_command,
                format!("Default command due to {}", e),
            )
        });
        let decision = decision.unwrap_or_else(|e| {
            warn!("Narration decider failed, skipping narration: {}", e);
            turn.used_fallback = true;
            NarrationDecision::fallback(format!("Default decision due to {}", e))
        });
        debug!(
            "Agent chose '{}' ({}); narrate: {} ({})",
            suggestion.command, suggestion.explanation, decision.should_update, decision.reason
        );

        if decision.should_update {
            turn.narrated = self.narrate(&game_output).await;
        }
        if turn.used_fallback {
            self.fallbacks += 1;
        }

        let narrated = turn.narrated;
        let action = suggestion.clone();
        if let Err(e) = self.logs.update_last_entry(|entry| {
            entry.story_updated = narrated;
            entry.agent_action = Some(action);
        }) {
            warn!("Failed to update journal entry: {}", e);
        }

        let command = Command::parse(&suggestion.command);
        if let Err(e) = self.logs.append_command(&command) {
            warn!("Failed to log command: {}", e);
        }
        self.console.show_command(&command);
        turn.command = Some(command.clone());
        debug!(
            "Turn {} finished: command {:?}, narrated {}, fallback {}",
            turn.index, turn.command, turn.narrated, turn.used_fallback
        );
        command
    }

    /// Ask the narrator about this turn; returns whether a narration was stored
    async fn narrate(&mut self, events: &str) -> bool {
        let previous = self
            .logs
            .recent_narrations(self.settings.narration_context)
            .unwrap_or_else(|e| {
                warn!("Failed to read story log: {}", e);
                String::new()
            });

        let narrator = self.agents.narrator.clone();
        let text = match with_timeout(self.agents.call_timeout, narrator.narrate(&previous, events)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Narrator failed, no narration this turn: {}", e);
                return false;
            }
        };
        if is_empty_narration(&text) {
            debug!("Narrator had nothing new");
            return false;
        }

        if let Err(e) = self.logs.append_narration(&text) {
            warn!("Failed to write narration: {}", e);
            return false;
        }
        self.narrations += 1;
        info!("📖 {}", text);

        if let Some(speech) = &self.agents.speech {
            if let Err(e) = speech.speak(&text).await {
                warn!("Speech failed: {}", e);
            }
        }
        true
    }

    async fn inject(&mut self, shutdown: &mut watch::Receiver<bool>) {
        let Some(command) = self.next_command.take() else {
            self.transition(LoopState::Reading);
            return;
        };

        if let Err(e) = self.terminal.inject(&command).await {
            error!("Failed to send '{}' to the game: {}", command, e);
            self.stop(ExitReason::TerminalError(e.to_string()));
            return;
        }
        info!("➡️  Sent '{}'", command);

        tokio::select! {
            _ = self.console.wait_for_key() => {}
            _ = shutdown_requested(shutdown) => {}
        }

        self.boundary.reset();
        self.transition(LoopState::Reading);
    }

    /// Flush what is left of the output and close the final turn
    fn drain(&mut self) {
        if let Some(update) = self.terminal.flush_pending(true) {
            self.observe(update);
        }

        if !self.turn_updates.is_empty() {
            let game_output = Turn::new(self.turns, std::mem::take(&mut self.turn_updates)).game_output();
            if let Err(e) = self.logs.record_turn(&game_output) {
                warn!("Failed to write final journal entry: {}", e);
            }
        }
        self.transition(LoopState::Closed);
    }
}

/// Bound an agent call, turning expiry into [`AgentError::Timeout`]
async fn with_timeout<F, R>(limit: Duration, call: F) -> std::result::Result<R, AgentError>
where
    F: Future<Output = std::result::Result<R, AgentError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(AgentError::Timeout(limit)))
}

/// Resolves once `shutdown` holds true; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
