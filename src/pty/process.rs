//! Interpreter Spawning
//!
//! Opens a pseudoterminal with portable-pty and starts the interpreter on
//! its slave side.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::streams::{PtyOutput, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::models::GameProcess;

/// What to launch and how to size its terminal
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Interpreter program, looked up on `PATH` unless it contains a `/`
    pub interpreter: String,
    /// Arguments, the game file last
    pub args: Vec<String>,
    /// Terminal rows
    pub rows: u16,
    /// Terminal columns
    pub cols: u16,
    /// Size of a single read from the master side
    pub read_chunk_size: usize,
}

impl SpawnConfig {
    /// Build a spawn configuration for `interpreter <extra_args..> <game_file>`
    pub fn for_game(interpreter: &str, extra_args: &[String], game_file: &Path) -> Self {
        let mut args = extra_args.to_vec();
        args.push(game_file.to_string_lossy().into_owned());
        Self {
            interpreter: interpreter.to_string(),
            args,
            ..Self::default()
        }
    }

    fn size(&self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interpreter: String::new(),
            args: Vec::new(),
            rows: 24,
            cols: 80,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Handles of a freshly started interpreter
pub struct SpawnedGame {
    pub process: GameProcess,
    pub child: Box<dyn Child + Send + Sync>,
    pub master: Box<dyn MasterPty + Send>,
    pub writer: Box<dyn Write + Send>,
    pub output: PtyOutput,
}

/// Open a PTY and start the interpreter attached to it
pub fn spawn_game(config: &SpawnConfig) -> Result<SpawnedGame> {
    let program = resolve_interpreter(&config.interpreter)?;
    let command = program.to_string_lossy().into_owned();

    let pair = native_pty_system()
        .openpty(config.size())
        .map_err(|e| Error::PtyCreationFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    let mut cmd_builder = CommandBuilder::new(&program);
    cmd_builder.args(&config.args);
    if let Ok(cwd) = std::env::current_dir() {
        cmd_builder.cwd(cwd);
    }

    let child = pair
        .slave
        .spawn_command(cmd_builder)
        .map_err(|e| Error::CommandSpawnFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;
    // The child holds its own copy; keeping ours would hide EOF.
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| Error::PtyReaderCloneFailed {
            reason: e.to_string(),
        })?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| Error::PtyWriterTakeFailed {
            reason: e.to_string(),
        })?;

    let process = GameProcess::started(&command, &config.args, child.process_id());
    info!("Spawned interpreter: {}", process);

    Ok(SpawnedGame {
        process,
        child,
        master: pair.master,
        writer,
        output: PtyOutput::spawn_reader(reader, config.read_chunk_size),
    })
}

/// Resolve the interpreter to an executable path
pub fn resolve_interpreter(program: &str) -> Result<PathBuf> {
    let not_found = || Error::InterpreterNotFound {
        program: program.to_string(),
    };

    if program.trim().is_empty() {
        return Err(not_found());
    }

    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let path = PathBuf::from(program);
        return if path.is_file() { Ok(path) } else { Err(not_found()) };
    }

    let path_var = std::env::var_os("PATH").ok_or_else(not_found)?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
        .ok_or_else(not_found)
}

/// Check that the game file exists before anything is spawned
pub fn validate_game_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::GameFileNotFound {
            path: path.to_path_buf(),
        })
    }
}
