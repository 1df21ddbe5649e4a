//! What the session knows about the interpreter it started.
//!
//! The OS handles live in [`crate::pty::PtySession`].

use std::fmt;
use std::path::Path;

/// Whether the interpreter is still playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// Exited on its own or was stopped; the code is unknown when reaping failed
    Exited { code: Option<u32> },
}

/// The interpreter and the story it was given
#[derive(Debug, Clone)]
pub struct GameProcess {
    pub interpreter: String,
    /// File name of the story, the last interpreter argument
    pub story: String,
    pub pid: Option<u32>,
    pub state: ProcessState,
}

impl GameProcess {
    pub fn started(interpreter: &str, args: &[String], pid: Option<u32>) -> Self {
        let program = Path::new(interpreter)
            .file_name()
            .map_or_else(|| interpreter.to_string(), |n| n.to_string_lossy().into_owned());
        let story = args
            .last()
            .and_then(|arg| Path::new(arg).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            interpreter: program,
            story,
            pid,
            state: ProcessState::Running,
        }
    }

    /// Record the exit. Returns false if it was already recorded.
    pub fn record_exit(&mut self, code: Option<u32>) -> bool {
        if self.has_exited() {
            return false;
        }
        self.state = ProcessState::Exited { code };
        true
    }

    pub fn has_exited(&self) -> bool {
        matches!(self.state, ProcessState::Exited { .. })
    }

    pub fn exit_code(&self) -> Option<u32> {
        match self.state {
            ProcessState::Exited { code } => code,
            ProcessState::Running => None,
        }
    }
}

impl fmt::Display for GameProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interpreter)?;
        if !self.story.is_empty() {
            write!(f, " {}", self.story)?;
        }
        if let Some(pid) = self.pid {
            write!(f, " (pid {})", pid)?;
        }
        match self.state {
            ProcessState::Running => Ok(()),
            ProcessState::Exited { code: Some(code) } => write!(f, ", exited with {}", code),
            ProcessState::Exited { code: None } => write!(f, ", exited"),
        }
    }
}
