//! Fixtures for turn loop tests

use async_trait::async_trait;
use fiction_pilot::agents::{AgentContext, CommandSuggester, NarrationDecider, Narrator};
use fiction_pilot::console::Console;
use fiction_pilot::history::SessionLogs;
use fiction_pilot::models::{Command, Update};
use fiction_pilot::orchestrator::{LoopSettings, TurnOrchestrator};
use fiction_pilot::terminal::QuiescenceBoundary;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::fake_terminal::FakeTerminal;

/// Agent context with the given collaborators and no speech
pub fn agent_context<S, D, N>(
    suggester: Arc<S>,
    decider: Arc<D>,
    narrator: Arc<N>,
    call_timeout: Duration,
) -> AgentContext
where
    S: CommandSuggester + 'static,
    D: NarrationDecider + 'static,
    N: Narrator + 'static,
{
    AgentContext {
        suggester,
        decider,
        narrator,
        speech: None,
        call_timeout,
        default_command: "look".to_string(),
    }
}

/// Turn loop over a fake terminal with a one second quiescence threshold
pub fn build_orchestrator(
    terminal: FakeTerminal,
    agents: AgentContext,
    log_dir: &Path,
    console: Box<dyn Console>,
) -> TurnOrchestrator<FakeTerminal> {
    let logs = SessionLogs::create(log_dir, Path::new("905.z5")).unwrap();
    TurnOrchestrator::new(
        terminal,
        Box::new(QuiescenceBoundary::new(Duration::from_secs(1))),
        agents,
        logs,
        console,
        LoopSettings::default(),
    )
}

/// Console that records what it was shown
#[derive(Clone, Default)]
pub struct RecordingConsole {
    lines: Arc<Mutex<Vec<String>>>,
    pauses: Arc<Mutex<usize>>,
}

impl RecordingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn pauses(&self) -> usize {
        *self.pauses.lock().unwrap()
    }
}

#[async_trait]
impl Console for RecordingConsole {
    fn show_update(&mut self, update: &Update) {
        self.lines.lock().unwrap().push(update.text().to_string());
    }

    fn show_command(&mut self, command: &Command) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("[AGENT] {}", command.display_text()));
    }

    async fn wait_for_key(&mut self) {
        *self.pauses.lock().unwrap() += 1;
    }
}
