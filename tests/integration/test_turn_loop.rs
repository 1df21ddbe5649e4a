//! Integration tests for the turn loop
//!
//! Every test runs on a paused clock: the fake terminal replays output at
//! fixed offsets and the loop's sleeps advance time instantly.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use fiction_pilot::agents::LlmAgents;
use fiction_pilot::console::NullConsole;
use fiction_pilot::history::InteractionLog;
use fiction_pilot::models::Command;
use fiction_pilot::orchestrator::ExitReason;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use test_utils::*;
use tokio::sync::watch;

const MINUTE: Duration = Duration::from_secs(60);

fn scripted(commands: &[&str]) -> Arc<ScriptedAgents> {
    Arc::new(ScriptedAgents::new(commands))
}

fn context_for(agents: &Arc<ScriptedAgents>) -> fiction_pilot::agents::AgentContext {
    agent_context(agents.clone(), agents.clone(), agents.clone(), MINUTE)
}

#[tokio::test(start_paused = true)]
async fn test_steady_output_never_starts_a_turn() {
    let dir = tempdir().unwrap();
    let mut terminal = FakeTerminal::new();
    for i in 0..=6u64 {
        terminal = terminal.chunk_at(i * 500, &format!("The river flows, part {}.\n", i));
    }
    let terminal = terminal.eof_at(3200);
    let handle = terminal.handle();
    let agents = scripted(&["north"]);

    let mut orchestrator =
        build_orchestrator(terminal, context_for(&agents), dir.path(), Box::new(NullConsole));
    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert_eq!(summary.turns, 0);
    assert_eq!(summary.updates, 7);
    assert_eq!(summary.exit_reason, ExitReason::EndOfStream);
    assert_eq!(agents.suggest_calls(), 0);
    assert!(handle.injected().is_empty());
    assert_eq!(handle.quit_count(), 1);

    // Drained output still lands in the journal
    let journal = orchestrator.logs().journal();
    assert_eq!(journal.len(), 1);
    assert!(journal[0].game_output.contains("part 6"));
    assert!(journal[0].agent_action.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_silence_triggers_exactly_one_command() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "West of House\nYou are standing in an open field.\n>")
        .eof_at(1250);
    let handle = terminal.handle();
    let agents = scripted(&["open mailbox"]);

    let mut orchestrator =
        build_orchestrator(terminal, context_for(&agents), dir.path(), Box::new(NullConsole));
    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert_eq!(summary.turns, 1);
    assert_eq!(
        handle.injected(),
        vec![Command::Line("open mailbox".to_string())]
    );
    assert_eq!(agents.suggest_calls(), 1);
    assert_eq!(agents.decide_calls(), 1);

    let request = &agents.requests()[0];
    assert!(request.transcript.contains("West of House"));
    assert!(!request.awaiting_keypress);

    let logs = orchestrator.logs();
    let journal = logs.journal();
    assert_eq!(journal.len(), 1);
    assert!(journal[0].game_output.contains("open field"));
    assert!(journal[0].game_output.ends_with('>'));
    let action = journal[0].agent_action.as_ref().unwrap();
    assert_eq!(action.command, "open mailbox");
    assert!(!journal[0].story_updated);

    let text_log = fs::read_to_string(&logs.paths().text_log).unwrap();
    assert!(text_log.contains("] West of House"));
    assert!(text_log.contains("] [AGENT] open mailbox"));
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_suggestion_falls_back_to_look() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "Forest\nThis is a forest, with trees in all directions.\n>")
        .eof_at(1250);
    let handle = terminal.handle();

    let interactions = Arc::new(InteractionLog::new(dir.path()));
    let agents = Arc::new(
        LlmAgents::new(CannedClient::new("I think you should go north, friend."))
            .with_interaction_log(interactions.clone()),
    );
    let context = agent_context(agents.clone(), agents.clone(), agents, MINUTE);

    let mut orchestrator = build_orchestrator(terminal, context, dir.path(), Box::new(NullConsole));
    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert_eq!(handle.injected(), vec![Command::Line("look".to_string())]);
    assert_eq!(summary.fallbacks, 1);
    assert_eq!(summary.narrations, 0);

    let journal = orchestrator.logs().journal();
    let action = journal[0].agent_action.as_ref().unwrap();
    assert_eq!(action.command, "look");
    assert!(action.explanation.starts_with("Default command due to"));
    assert!(!journal[0].story_updated);

    assert_eq!(interactions.records("game_agent").unwrap().len(), 1);
    assert_eq!(interactions.records("update_decider").unwrap().len(), 1);
    assert!(interactions.records("story_narration").unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_second_command_while_agent_is_pending() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new().chunk_at(0, "Behind House\n>");
    let handle = terminal.handle();

    let held = Arc::new(HeldSuggester::new("west"));
    let agents = scripted(&[]);
    let context = agent_context(held.clone(), agents.clone(), agents, Duration::from_secs(3600));
    let mut orchestrator = build_orchestrator(terminal, context, dir.path(), Box::new(NullConsole));

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let summary = orchestrator.run(rx).await;
        (orchestrator, summary)
    });

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(held.calls(), 1);
    assert!(handle.injected().is_empty());

    held.release();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.injected(), vec![Command::Line("west".to_string())]);
    assert_eq!(held.calls(), 1);

    tx.send(true).unwrap();
    let (_orchestrator, summary) = task.await.unwrap();
    let summary = summary.unwrap();
    assert_eq!(summary.exit_reason, ExitReason::Interrupted);
    assert_eq!(handle.quit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_agent_timeout_uses_default_command() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "Attic\nThe attic is dark.\n>")
        .eof_at(3500);
    let handle = terminal.handle();

    let held = Arc::new(HeldSuggester::new("climb rope"));
    let agents = scripted(&[]);
    let context = agent_context(held, agents.clone(), agents, Duration::from_secs(2));
    let mut orchestrator = build_orchestrator(terminal, context, dir.path(), Box::new(NullConsole));

    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert_eq!(handle.injected(), vec![Command::Line("look".to_string())]);
    assert_eq!(summary.fallbacks, 1);
    let action = orchestrator.logs().journal()[0]
        .agent_action
        .clone()
        .unwrap();
    assert!(action.explanation.contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_narration_is_stored_and_spoken() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "West of House\nThere is a small mailbox here.\n>")
        .reply_to_commands(200, "Opening the small mailbox reveals a leaflet.\n>")
        .eof_at(2000);
    let handle = terminal.handle();

    let agents = Arc::new(
        ScriptedAgents::new(&["open mailbox"])
            .narrating("You stand before a white house, a mailbox at your feet."),
    );
    let speech = Arc::new(RecordingSpeech::default());
    let context = context_for(&agents).with_speech(Some(speech.clone()));
    let mut orchestrator = build_orchestrator(terminal, context, dir.path(), Box::new(NullConsole));

    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert_eq!(handle.injected().len(), 1);
    assert_eq!(summary.narrations, 1);
    assert_eq!(
        speech.spoken(),
        vec!["You stand before a white house, a mailbox at your feet.".to_string()]
    );

    let inputs = agents.narration_inputs();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].0.is_empty());
    assert!(inputs[0].1.contains("small mailbox"));

    let logs = orchestrator.logs();
    let journal = logs.journal();
    assert_eq!(journal.len(), 2);
    assert!(journal[0].story_updated);
    assert!(journal[1].game_output.contains("leaflet"));
    assert!(journal[1].agent_action.is_none());

    let story = fs::read_to_string(&logs.paths().story_log).unwrap();
    assert_eq!(story.lines().count(), 1);
    assert!(story.contains("[STORY] You stand before a white house"));
}

#[tokio::test(start_paused = true)]
async fn test_nothing_to_narrate_is_not_stored() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "I don't know the word \"xyzzy\".\n>")
        .eof_at(1250);

    let agents = Arc::new(ScriptedAgents::new(&["look"]).narrating("No new events to narrate."));
    let speech = Arc::new(RecordingSpeech::default());
    let context = context_for(&agents).with_speech(Some(speech.clone()));
    let mut orchestrator = build_orchestrator(terminal, context, dir.path(), Box::new(NullConsole));

    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert_eq!(summary.narrations, 0);
    assert!(speech.spoken().is_empty());
    assert!(!orchestrator.logs().journal()[0].story_updated);
    let story = fs::read_to_string(&orchestrator.logs().paths().story_log).unwrap();
    assert!(story.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_continuation_prompt_is_answered_with_enter() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "A long introduction unfolds***MORE***")
        .eof_at(1250);
    let handle = terminal.handle();
    let agents = scripted(&["ENTER"]);

    let mut orchestrator =
        build_orchestrator(terminal, context_for(&agents), dir.path(), Box::new(NullConsole));
    let (_tx, rx) = watch::channel(false);
    orchestrator.run(rx).await.unwrap();

    assert!(agents.requests()[0].awaiting_keypress);
    assert_eq!(handle.injected(), vec![Command::Enter]);
    let text_log = fs::read_to_string(&orchestrator.logs().paths().text_log).unwrap();
    assert!(text_log.contains("[AGENT] ENTER"));
}

#[tokio::test(start_paused = true)]
async fn test_decider_sees_a_bounded_window() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "Clearing\n>")
        .reply_to_commands(200, "Time passes.\n>")
        .eof_at(6000);
    let agents = scripted(&[]);

    let mut orchestrator =
        build_orchestrator(terminal, context_for(&agents), dir.path(), Box::new(NullConsole));
    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    let windows = agents.decision_windows();
    assert!(windows.len() >= 4);
    assert_eq!(&windows[..3], &[1, 2, 3]);
    assert!(windows.iter().all(|w| *w <= 3));
    assert_eq!(summary.turns as usize, windows.len());
}

#[tokio::test(start_paused = true)]
async fn test_console_sees_output_and_commands() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new().chunk_at(0, "Kitchen\n>").eof_at(1250);
    let agents = scripted(&["north"]);
    let console = RecordingConsole::default();

    let mut orchestrator = build_orchestrator(
        terminal,
        context_for(&agents),
        dir.path(),
        Box::new(console.clone()),
    );
    let (_tx, rx) = watch::channel(false);
    orchestrator.run(rx).await.unwrap();

    assert_eq!(
        console.lines(),
        vec![
            "Kitchen".to_string(),
            ">".to_string(),
            "[AGENT] north".to_string()
        ]
    );
    assert_eq!(console.pauses(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drains_pending_output() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new().chunk_at(0, "Loading the story file");
    let handle = terminal.handle();
    let agents = scripted(&[]);
    let mut orchestrator =
        build_orchestrator(terminal, context_for(&agents), dir.path(), Box::new(NullConsole));

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let summary = orchestrator.run(rx).await;
        (orchestrator, summary)
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.send(true).unwrap();
    let (orchestrator, summary) = task.await.unwrap();
    let summary = summary.unwrap();

    assert_eq!(summary.exit_reason, ExitReason::Interrupted);
    assert_eq!(summary.turns, 0);
    assert!(handle.injected().is_empty());
    assert_eq!(handle.quit_count(), 1);

    let journal = orchestrator.logs().journal();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].game_output, "Loading the story file");
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_ends_the_session() {
    let dir = tempdir().unwrap();
    let terminal = FakeTerminal::new()
        .chunk_at(0, "Cellar\n>")
        .failing_writes();
    let handle = terminal.handle();
    let agents = scripted(&["up"]);

    let mut orchestrator =
        build_orchestrator(terminal, context_for(&agents), dir.path(), Box::new(NullConsole));
    let (_tx, rx) = watch::channel(false);
    let summary = orchestrator.run(rx).await.unwrap();

    assert!(matches!(summary.exit_reason, ExitReason::TerminalError(_)));
    assert_eq!(summary.turns, 1);
    assert!(handle.injected().is_empty());
    assert_eq!(handle.quit_count(), 1);
}
