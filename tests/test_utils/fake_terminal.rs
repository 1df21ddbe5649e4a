//! Scripted game terminal
//!
//! Replays byte chunks at fixed offsets from its creation time through the
//! real [`OutputSegmenter`]. Meant for `start_paused` tests, where sleeping
//! advances the mocked clock instantly.

use async_trait::async_trait;
use fiction_pilot::error::{Error, Result};
use fiction_pilot::models::{Command, Update};
use fiction_pilot::pty::{GameTerminal, PollResult};
use fiction_pilot::terminal::OutputSegmenter;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Shared view of what the loop did to the terminal
#[derive(Debug, Clone, Default)]
pub struct TerminalHandle {
    injected: Arc<Mutex<Vec<Command>>>,
    quits: Arc<AtomicUsize>,
}

impl TerminalHandle {
    pub fn injected(&self) -> Vec<Command> {
        self.injected.lock().unwrap().clone()
    }

    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

pub struct FakeTerminal {
    start: Instant,
    script: VecDeque<(Duration, Vec<u8>)>,
    eof_at: Option<Duration>,
    reply: Option<(Duration, Vec<u8>)>,
    fail_writes: bool,
    segmenter: OutputSegmenter,
    alive: bool,
    handle: TerminalHandle,
}

impl FakeTerminal {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            script: VecDeque::new(),
            eof_at: None,
            reply: None,
            fail_writes: false,
            segmenter: OutputSegmenter::new(),
            alive: true,
            handle: TerminalHandle::default(),
        }
    }

    /// Deliver `text` `at_ms` milliseconds after creation
    pub fn chunk_at(mut self, at_ms: u64, text: &str) -> Self {
        self.schedule(Duration::from_millis(at_ms), text.as_bytes().to_vec());
        self
    }

    /// Deliver raw bytes `at_ms` milliseconds after creation
    pub fn bytes_at(mut self, at_ms: u64, bytes: &[u8]) -> Self {
        self.schedule(Duration::from_millis(at_ms), bytes.to_vec());
        self
    }

    /// Close the stream `at_ms` milliseconds after creation
    pub fn eof_at(mut self, at_ms: u64) -> Self {
        self.eof_at = Some(Duration::from_millis(at_ms));
        self
    }

    /// Answer every injected command with `text` after `delay_ms`
    pub fn reply_to_commands(mut self, delay_ms: u64, text: &str) -> Self {
        self.reply = Some((Duration::from_millis(delay_ms), text.as_bytes().to_vec()));
        self
    }

    /// Make every write fail
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn handle(&self) -> TerminalHandle {
        self.handle.clone()
    }

    fn schedule(&mut self, at: Duration, bytes: Vec<u8>) {
        let index = self.script.partition_point(|(due, _)| *due <= at);
        self.script.insert(index, (at, bytes));
    }

    fn next_event(&self) -> Option<Duration> {
        let next_chunk = self.script.front().map(|(at, _)| *at);
        match (next_chunk, self.eof_at) {
            (Some(chunk), Some(eof)) => Some(chunk.min(eof)),
            (chunk, eof) => chunk.or(eof),
        }
    }
}

impl Default for FakeTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameTerminal for FakeTerminal {
    async fn poll(&mut self, timeout: Duration) -> Result<PollResult> {
        if !self.alive {
            return Ok(PollResult {
                eof: true,
                ..PollResult::default()
            });
        }

        let deadline = Instant::now() + timeout;
        let wake = match self.next_event() {
            Some(at) => (self.start + at).min(deadline),
            None => deadline,
        };
        tokio::time::sleep_until(wake).await;

        let elapsed = self.start.elapsed();
        let mut result = PollResult::default();
        while self.script.front().is_some_and(|(at, _)| *at <= elapsed) {
            if let Some((_, bytes)) = self.script.pop_front() {
                result.received += bytes.len();
                result.updates.extend(self.segmenter.feed(&bytes));
            }
        }
        if self.eof_at.is_some_and(|at| at <= elapsed) {
            result.eof = true;
            self.alive = false;
        }
        Ok(result)
    }

    fn flush_pending(&mut self, force: bool) -> Option<Update> {
        self.segmenter.flush(force)
    }

    fn pending_text(&self) -> &str {
        self.segmenter.pending()
    }

    async fn inject(&mut self, command: &Command) -> Result<()> {
        if !self.alive {
            return Err(Error::SessionNotAlive);
        }
        if self.fail_writes {
            return Err(Error::PtyWriteFailed {
                reason: "broken pipe".to_string(),
            });
        }

        self.handle.injected.lock().unwrap().push(command.clone());
        if let Some((delay, bytes)) = self.reply.clone() {
            let at = self.start.elapsed() + delay;
            self.schedule(at, bytes);
        }
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.handle.quits.fetch_add(1, Ordering::SeqCst);
        self.alive = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}
