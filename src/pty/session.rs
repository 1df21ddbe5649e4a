//! PTY Session Controller
//!
//! Owns the interpreter, its pseudoterminal and the segmenter fed from it.
//! A session is created by [`PtySession::start`] and torn down by
//! [`PtySession::quit`], which also runs from `Drop` so every exit path
//! releases the child.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use portable_pty::{Child, MasterPty};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use super::operations::{GameTerminal, PollResult};
use super::process::{spawn_game, validate_game_file, SpawnConfig};
use super::streams::{PtyOutput, ReadOutcome, StreamStats};
use crate::error::{Error, Result};
use crate::models::{Command, GameProcess, Update};
use crate::terminal::OutputSegmenter;

/// Chunks drained without waiting after the first one of a poll
const MAX_CHUNKS_PER_POLL: usize = 64;

/// How long the interpreter gets to exit after SIGTERM
const TERMINATE_GRACE: Duration = Duration::from_millis(300);

/// One run of the interpreter behind a pseudoterminal
pub struct PtySession {
    process: GameProcess,
    child: Option<Box<dyn Child + Send + Sync>>,
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    output: Option<PtyOutput>,
    segmenter: OutputSegmenter,
    alive: bool,
    created_at: DateTime<Local>,
}

impl PtySession {
    /// Validate the game file, then spawn the interpreter on a new PTY.
    ///
    /// # Errors
    /// Missing game file, unknown interpreter, or a failed PTY allocation
    /// or spawn. None of these are retried.
    pub fn start(game_file: &Path, config: &SpawnConfig) -> Result<Self> {
        validate_game_file(game_file)?;
        let spawned = spawn_game(config)?;

        Ok(Self {
            process: spawned.process,
            child: Some(spawned.child),
            master: Some(spawned.master),
            writer: Some(spawned.writer),
            output: Some(spawned.output),
            segmenter: OutputSegmenter::new(),
            alive: true,
            created_at: Local::now(),
        })
    }

    /// Lifecycle record of the interpreter
    pub fn process(&self) -> &GameProcess {
        &self.process
    }

    /// When the session was started
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// I/O counters, empty once the session is closed
    pub fn stats(&self) -> StreamStats {
        self.output
            .as_ref()
            .map(|output| output.stats().clone())
            .unwrap_or_default()
    }

    /// Wait for output and feed it to the segmenter.
    ///
    /// Only the first chunk is waited for; chunks already queued behind it
    /// are drained in the same call.
    pub async fn poll(&mut self, timeout: Duration) -> Result<PollResult> {
        let mut result = PollResult::default();
        let Some(output) = self.output.as_mut() else {
            result.eof = true;
            return Ok(result);
        };

        let mut outcome = output.read_with_timeout(timeout).await;
        let mut drained = 0;
        loop {
            match outcome {
                ReadOutcome::Data(bytes) => {
                    result.received += bytes.len();
                    result.updates.extend(self.segmenter.feed(&bytes));
                }
                ReadOutcome::Closed => {
                    result.eof = true;
                    break;
                }
                ReadOutcome::TimedOut => break,
            }

            drained += 1;
            if drained >= MAX_CHUNKS_PER_POLL {
                break;
            }
            match output.try_read_now() {
                Some(next) => outcome = next,
                None => break,
            }
        }

        if result.eof {
            debug!("Interpreter closed the terminal");
            self.alive = false;
        }
        Ok(result)
    }

    /// Emit the segmenter's pending text
    pub fn flush_pending(&mut self, force: bool) -> Option<Update> {
        self.segmenter.flush(force)
    }

    /// Text waiting in the segmenter
    pub fn pending_text(&self) -> &str {
        self.segmenter.pending()
    }

    /// Write a command in a single write.
    ///
    /// # Errors
    /// [`Error::SessionNotAlive`] after EOF or quit, [`Error::PtyWriteFailed`]
    /// when the descriptor rejects the write.
    pub fn inject(&mut self, command: &Command) -> Result<()> {
        if !self.alive {
            return Err(Error::SessionNotAlive);
        }
        let writer = self.writer.as_mut().ok_or(Error::SessionNotAlive)?;

        let bytes = command.to_bytes();
        writer
            .write_all(&bytes)
            .and_then(|()| writer.flush())
            .map_err(|e| Error::PtyWriteFailed {
                reason: e.to_string(),
            })?;

        if let Some(output) = self.output.as_mut() {
            output.record_write(bytes.len());
        }
        debug!("Injected {:?}", command.display_text());
        Ok(())
    }

    /// Terminate the interpreter and release the terminal.
    ///
    /// Sends SIGTERM, waits briefly, then kills. Safe to call repeatedly.
    /// Blocks the calling thread for up to the grace period; async callers
    /// go through [`GameTerminal::quit`], which waits on a blocking task.
    pub fn quit(&mut self) -> Result<()> {
        let exit_code = self
            .release_child()
            .and_then(|mut child| terminate_child(child.as_mut()));
        self.finish_quit(exit_code);
        Ok(())
    }

    /// Stop writing and hand over the child for termination
    fn release_child(&mut self) -> Option<Box<dyn Child + Send + Sync>> {
        self.alive = false;

        // Closing our side first lets a well-behaved interpreter see EOF.
        self.writer.take();
        self.child.take()
    }

    fn finish_quit(&mut self, exit_code: Option<u32>) {
        self.output.take();
        self.master.take();

        if self.process.record_exit(exit_code) {
            info!("Game session closed: {}", self.process);
        }
    }

    /// Whether commands can still be written
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Stop the child, returning its exit code when known
fn terminate_child(child: &mut (dyn Child + Send + Sync)) -> Option<u32> {
    if let Ok(Some(status)) = child.try_wait() {
        return Some(status.exit_code());
    }
    if let Some(code) = request_exit(child) {
        return Some(code);
    }

    if let Err(e) = child.kill() {
        debug!("Kill failed (child likely gone): {}", e);
    }
    match child.wait() {
        Ok(status) => Some(status.exit_code()),
        Err(e) => {
            warn!("Failed to reap interpreter: {}", e);
            None
        }
    }
}

/// Send SIGTERM and give the child a short grace period to exit
#[cfg(unix)]
fn request_exit(child: &mut (dyn Child + Send + Sync)) -> Option<u32> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = child.process_id()?;
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        debug!("SIGTERM to {} failed: {}", pid, e);
        return None;
    }

    let deadline = Instant::now() + TERMINATE_GRACE;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status.exit_code()),
            Ok(None) => std::thread::sleep(Duration::from_millis(20)),
            Err(_) => break,
        }
    }
    None
}

#[cfg(not(unix))]
fn request_exit(_child: &mut (dyn Child + Send + Sync)) -> Option<u32> {
    None
}

impl Drop for PtySession {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.quit() {
                warn!("Failed to close game session on drop: {}", e);
            }
        }
    }
}

#[async_trait]
impl GameTerminal for PtySession {
    async fn poll(&mut self, timeout: Duration) -> Result<PollResult> {
        PtySession::poll(self, timeout).await
    }

    fn flush_pending(&mut self, force: bool) -> Option<Update> {
        PtySession::flush_pending(self, force)
    }

    fn pending_text(&self) -> &str {
        PtySession::pending_text(self)
    }

    async fn inject(&mut self, command: &Command) -> Result<()> {
        PtySession::inject(self, command)
    }

    async fn quit(&mut self) -> Result<()> {
        let exit_code = match self.release_child() {
            Some(mut child) => tokio::task::spawn_blocking(move || terminate_child(child.as_mut()))
                .await
                .unwrap_or_else(|e| {
                    warn!("Interpreter teardown task failed: {}", e);
                    None
                }),
            None => None,
        };
        self.finish_quit(exit_code);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        PtySession::is_alive(self)
    }
}
