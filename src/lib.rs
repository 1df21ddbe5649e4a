//! fiction-pilot - LLM agents playing parser interactive fiction
//!
//! Runs an interactive fiction interpreter (such as `dfrotz`) inside a
//! pseudoterminal, watches its output until the game goes quiet, asks a
//! command agent what to type next, and keeps a narrated story of the run.
//!
//! ## Module Organization
//!
//! - [`pty`] - Spawning the interpreter, reading and writing its terminal
//! - [`terminal`] - Output segmentation and turn boundary detection
//! - [`orchestrator`] - The Reading / Deciding / Injecting turn loop
//! - [`agents`] - Command, narration decision and narrator collaborators
//! - [`history`] - Text log, story log, JSON journal, interaction logs
//! - [`config`] - TOML configuration and environment toggles
//! - [`models`] - Updates, commands, turns, journal records
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Threading
//!
//! A blocking reader thread drains the PTY and forwards chunks over a
//! `tokio::mpsc` channel; everything else runs on the tokio runtime.
//! Agent calls for one turn run concurrently and are each bounded by a
//! timeout.

#[macro_use]
extern crate tracing;

pub mod agents;
pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod pty;
pub mod speech;
pub mod terminal;

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

// Re-exports for core functionality
pub use config::loader::ConfigLoader;
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::{ExitReason, LoopSettings, LoopState, RunSummary, TurnOrchestrator};

/// The current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The application description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// File inside the log directory that receives diagnostics
pub const DIAGNOSTICS_FILE: &str = "fiction-pilot.log";

/// Install the global tracing subscriber.
///
/// Diagnostics go to `<log_dir>/fiction-pilot.log` so they never interleave
/// with the game text echoed on stdout. `RUST_LOG` overrides the level.
///
/// # Errors
/// Returns [`Error::LogWriteFailed`] when the log directory or file cannot
/// be created.
pub fn init_logging(log_dir: &Path, debug: bool) -> Result<()> {
    fs::create_dir_all(log_dir).map_err(|e| Error::LogWriteFailed {
        path: log_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let path = log_dir.join(DIAGNOSTICS_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::LogWriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let log_level = if debug { "debug" } else { "info" };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to install logger: {}", e)))?;

    Ok(())
}
