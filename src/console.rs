//! Operator console
//!
//! Echoes game output as it arrives, shows each injected command as
//! `[AGENT] <command>`, and optionally pauses for the operator between turns.

use async_trait::async_trait;
use std::io::{BufRead, BufReader, Read, Write};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::history::AGENT_TAG;
use crate::models::{Command, Update};

/// Where the operator watches the session
#[async_trait]
pub trait Console: Send {
    /// Show one update as received
    fn show_update(&mut self, update: &Update);

    /// Show a command the agent chose
    fn show_command(&mut self, command: &Command);

    /// Block until the operator presses Enter, if pausing is enabled
    async fn wait_for_key(&mut self);
}

/// What the key reader thread saw
#[derive(Debug)]
enum KeyEvent {
    Line,
    Failed(String),
}

/// Read lines on a plain thread so a pending read never holds up runtime
/// shutdown. The channel closes at end of input.
fn spawn_key_reader<R>(input: R) -> UnboundedReceiver<KeyEvent>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("console-keys".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(input);
            let mut line = String::new();
            loop {
                line.clear();
                let event = match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => KeyEvent::Line,
                    Err(e) => KeyEvent::Failed(e.to_string()),
                };
                let failed = matches!(event, KeyEvent::Failed(_));
                if tx.send(event).is_err() || failed {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start the console key reader: {}", e);
    }
    rx
}

/// Console on the process's stdout and stdin
pub struct StdoutConsole {
    keys: Option<UnboundedReceiver<KeyEvent>>,
}

impl StdoutConsole {
    pub fn new(wait_for_key: bool) -> Self {
        Self::with_input(wait_for_key, std::io::stdin())
    }

    /// Pause on lines from `input` instead of stdin
    pub fn with_input<R>(wait_for_key: bool, input: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            keys: wait_for_key.then(|| spawn_key_reader(input)),
        }
    }

    /// Whether the console still pauses between turns
    pub fn is_pausing(&self) -> bool {
        self.keys.is_some()
    }

    fn write(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            debug!("Failed to write to stdout: {}", e);
        }
    }
}

#[async_trait]
impl Console for StdoutConsole {
    fn show_update(&mut self, update: &Update) {
        self.write(&format!("{}{}", update.text(), update.terminator.suffix()));
    }

    fn show_command(&mut self, command: &Command) {
        self.write(&format!("\n{} {}\n", AGENT_TAG, command.display_text()));
    }

    async fn wait_for_key(&mut self) {
        if !self.is_pausing() {
            return;
        }

        self.write("\nPress Enter to continue...");
        let event = match self.keys.as_mut() {
            Some(keys) => keys.recv().await,
            None => return,
        };
        match event {
            Some(KeyEvent::Line) => {}
            None => {
                info!("stdin closed, no longer pausing between turns");
                self.keys = None;
            }
            Some(KeyEvent::Failed(e)) => {
                warn!("Failed to read stdin, no longer pausing: {}", e);
                self.keys = None;
            }
        }
        self.write(&format!("\r{}\r", " ".repeat(40)));
    }
}

/// Console that shows nothing and never pauses
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConsole;

#[async_trait]
impl Console for NullConsole {
    fn show_update(&mut self, _update: &Update) {}

    fn show_command(&mut self, _command: &Command) {}

    async fn wait_for_key(&mut self) {}
}
