//! Narration playback
//!
//! Hands each narration to an external synthesizer (`say` on macOS,
//! `espeak` elsewhere). Callers log and ignore failures.

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::SpeechConfig;
use crate::error::{Error, Result};

/// Accepts narration text and plays it
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Speaks by running a synthesizer program with the text as last argument
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

#[async_trait]
impl SpeechSink for CommandSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::Other(format!("Failed to run '{}': {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "'{}' exited with {}",
                self.program, status
            )))
        }
    }
}
