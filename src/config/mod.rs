//! Configuration management for fiction-pilot
//!
//! Typed TOML configuration. Every field has a default, so an empty file
//! (or no file at all) yields a runnable setup.

pub mod loader;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter and story file
    pub game: GameConfig,

    /// Terminal and turn-boundary tuning
    pub pty: PtyConfig,

    /// LLM backend and agent behaviour
    pub agents: AgentsConfig,

    /// Operator-facing toggles
    pub interaction: InteractionConfig,

    /// Log file locations
    pub logging: LoggingConfig,

    /// Speech synthesizer
    pub speech: SpeechConfig,
}

/// Which interpreter runs which story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Interpreter program; looked up on `PATH` unless it contains a `/`
    pub interpreter: String,

    /// Story file handed to the interpreter
    pub game_file: PathBuf,

    /// Arguments placed before the story file
    pub extra_args: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            interpreter: "dfrotz".to_string(),
            game_file: PathBuf::from("games/905.z5"),
            extra_args: Vec::new(),
        }
    }
}

/// How turn boundaries are detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Silence longer than `quiescence_ms`
    #[default]
    Quiescence,
    /// Shorter silence once the prompt pattern is visible
    Prompt,
}

/// PTY-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PtyConfig {
    /// Bound on a single readiness wait
    pub poll_interval_ms: u64,

    /// Silence after which the game is presumed to wait for input
    pub quiescence_ms: u64,

    /// Bytes per read from the master side
    pub read_chunk_size: usize,

    pub rows: u16,
    pub cols: u16,

    /// Turn boundary strategy
    pub boundary: BoundaryKind,

    /// Prompt text for [`BoundaryKind::Prompt`]
    pub prompt_pattern: String,

    /// Silence required once the prompt is visible
    pub prompt_quiet_ms: u64,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            quiescence_ms: 1000,
            read_chunk_size: 4096,
            rows: 24,
            cols: 80,
            boundary: BoundaryKind::Quiescence,
            prompt_pattern: ">".to_string(),
            prompt_quiet_ms: 250,
        }
    }
}

/// LLM agents configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Model name sent to the backend
    pub model: String,

    /// Base URL of the generative language API
    pub api_base: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Upper bound on a single agent call
    pub call_timeout_secs: u64,

    /// Command injected when the suggestion agent fails
    pub default_command: String,

    /// Journal entries shown to the narration decider
    pub decision_window: usize,

    /// Story log lines shown to the narrator
    pub narration_context: usize,

    /// Transcript lines shown to the command agent
    pub transcript_lines: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            call_timeout_secs: 60,
            default_command: "look".to_string(),
            decision_window: 3,
            narration_context: 3,
            transcript_lines: 400,
        }
    }
}

/// Operator-facing toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Pause for a keypress after each injected command
    pub wait_for_key: bool,

    /// Speak each narration
    pub use_tts: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            wait_for_key: true,
            use_tts: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for session logs, agent interactions and diagnostics
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// External speech synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub program: String,
    /// Arguments placed before the narration text
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let program = if cfg!(target_os = "macos") {
            "say"
        } else {
            "espeak"
        };
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }
}

/// Environment toggle for [`InteractionConfig::wait_for_key`]
pub const WAIT_FOR_KEY_ENV: &str = "WAIT_FOR_KEY";

/// Environment toggle for [`InteractionConfig::use_tts`]
pub const USE_TTS_ENV: &str = "USE_TTS";

/// Interpret an environment toggle; `true`, `1`, `yes` and `on` enable
pub fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

impl Config {
    /// Apply `WAIT_FOR_KEY` and `USE_TTS` from an environment lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(WAIT_FOR_KEY_ENV) {
            self.interaction.wait_for_key = parse_toggle(&value);
        }
        if let Some(value) = lookup(USE_TTS_ENV) {
            self.interaction.use_tts = parse_toggle(&value);
        }
    }

    /// Reject settings the turn loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            Err(Error::ConfigValidationFailed {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.game.interpreter.trim().is_empty() {
            return invalid("game.interpreter", "Interpreter cannot be empty");
        }
        if self.pty.poll_interval_ms == 0 {
            return invalid("pty.poll_interval_ms", "Poll interval must be greater than 0");
        }
        if self.pty.quiescence_ms == 0 {
            return invalid("pty.quiescence_ms", "Quiescence threshold must be greater than 0");
        }
        if self.pty.read_chunk_size == 0 {
            return invalid("pty.read_chunk_size", "Read chunk size must be greater than 0");
        }
        if self.pty.rows == 0 || self.pty.cols == 0 {
            return invalid("pty.rows", "Terminal dimensions must be greater than 0");
        }
        if self.agents.call_timeout_secs == 0 {
            return invalid("agents.call_timeout_secs", "Call timeout must be greater than 0");
        }
        if self.agents.default_command.trim().is_empty() {
            return invalid("agents.default_command", "Default command cannot be empty");
        }
        if self.agents.model.trim().is_empty() {
            return invalid("agents.model", "Model name cannot be empty");
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.pty.poll_interval_ms)
    }

    pub fn quiescence_threshold(&self) -> Duration {
        Duration::from_millis(self.pty.quiescence_ms)
    }

    pub fn prompt_quiet(&self) -> Duration {
        Duration::from_millis(self.pty.prompt_quiet_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.agents.call_timeout_secs)
    }
}
