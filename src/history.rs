//! Session persistence
//!
//! Three files per run, all under the log directory and named after the
//! story file plus the session start time:
//!
//! - `<game>_<stamp>_game.log`: timestamped game lines and `[AGENT]` commands
//! - `<game>_<stamp>_updates.json`: the turn journal, one evolving JSON array
//! - `<game>_<stamp>_story.log`: `[STORY]` narrations
//!
//! Agent exchanges go to `<agent>_interactions.json`, shared across runs.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{Command, JournalEntry, Update};

/// Tag for injected commands in the game log
pub const AGENT_TAG: &str = "[AGENT]";

/// Tag for narrations in the story log
pub const STORY_TAG: &str = "[STORY]";

/// Pre-compiled `[HH:MM:SS.mmm]` line prefix
static LEADING_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\.\d{3}\]\s?").expect("valid timestamp regex"));

/// Wall clock in the log format, `HH:MM:SS.mmm`
pub fn clock_timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Strip leading `[HH:MM:SS.mmm]` stamps and drop blank lines
pub fn clean_log_text(text: &str) -> String {
    text.lines()
        .map(|line| LEADING_TIMESTAMP.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Last `n` elements of a slice
fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// File locations of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub text_log: PathBuf,
    pub journal: PathBuf,
    pub story_log: PathBuf,
}

impl SessionPaths {
    /// Derive file names from the story file's base name and the start time
    pub fn new(log_dir: &Path, game_file: &Path, started: DateTime<Local>) -> Self {
        let game_name = game_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "game".to_string());
        let stem = format!("{}_{}", game_name, started.format("%Y%m%d_%H%M%S"));

        Self {
            text_log: log_dir.join(format!("{stem}_game.log")),
            journal: log_dir.join(format!("{stem}_updates.json")),
            story_log: log_dir.join(format!("{stem}_story.log")),
        }
    }
}

/// Append-only record of one session
#[derive(Debug)]
pub struct SessionLogs {
    paths: SessionPaths,
    journal: Vec<JournalEntry>,
}

impl SessionLogs {
    /// Create the log directory and empty session files
    pub fn create(log_dir: &Path, game_file: &Path) -> Result<Self> {
        Self::create_at(SessionPaths::new(log_dir, game_file, Local::now()))
    }

    /// Create the session files at explicit locations
    pub fn create_at(paths: SessionPaths) -> Result<Self> {
        for path in [&paths.text_log, &paths.journal, &paths.story_log] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
            }
        }
        for path in [&paths.text_log, &paths.story_log] {
            open_append(path)?;
        }

        let logs = Self {
            paths,
            journal: Vec::new(),
        };
        logs.write_journal()?;
        info!("Session logs at {}", logs.paths.text_log.display());
        Ok(logs)
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Append one game line to the text log
    pub fn append_update(&self, update: &Update) -> Result<()> {
        append_line(&self.paths.text_log, update.text())
    }

    /// Append an injected command to the text log
    pub fn append_command(&self, command: &Command) -> Result<()> {
        append_line(
            &self.paths.text_log,
            &format!("{} {}", AGENT_TAG, command.display_text()),
        )
    }

    /// Append a narration to the story log
    pub fn append_narration(&self, narration: &str) -> Result<()> {
        let single_line = narration.trim().replace('\n', " ");
        append_line(
            &self.paths.story_log,
            &format!("{} {}", STORY_TAG, single_line),
        )
    }

    /// Add a journal entry for the output of a turn
    pub fn record_turn(&mut self, game_output: &str) -> Result<()> {
        self.journal
            .push(JournalEntry::new(clock_timestamp(), clean_log_text(game_output)));
        self.write_journal()
    }

    /// Modify the newest journal entry in place.
    ///
    /// Returns `false` when the journal is empty.
    pub fn update_last_entry<F>(&mut self, update: F) -> Result<bool>
    where
        F: FnOnce(&mut JournalEntry),
    {
        let Some(last) = self.journal.last_mut() else {
            return Ok(false);
        };
        update(last);
        self.write_journal()?;
        Ok(true)
    }

    /// The whole journal
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// The newest `n` journal entries
    pub fn recent_entries(&self, n: usize) -> &[JournalEntry] {
        tail(&self.journal, n)
    }

    /// Cleaned game log, capped to its last `max_lines` lines
    pub fn transcript(&self, max_lines: usize) -> Result<String> {
        let text = read_or_empty(&self.paths.text_log)?;
        let cleaned = clean_log_text(&text);
        let lines: Vec<&str> = cleaned.lines().collect();
        Ok(tail(&lines, max_lines).join("\n"))
    }

    /// The newest `n` non-blank story log lines
    pub fn recent_narrations(&self, n: usize) -> Result<String> {
        let text = read_or_empty(&self.paths.story_log)?;
        let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
        Ok(tail(&lines, n).join("\n"))
    }

    fn write_journal(&self) -> Result<()> {
        write_json(&self.paths.journal, &self.journal)
    }
}

/// One recorded exchange with an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: String,
    pub system_message: String,
    pub prompt: String,
    pub response: String,
}

impl InteractionRecord {
    pub fn new(system_message: &str, prompt: &str, response: &str) -> Self {
        Self {
            timestamp: clock_timestamp(),
            system_message: system_message.to_string(),
            prompt: prompt.to_string(),
            response: response.to_string(),
        }
    }
}

/// Per-agent JSON logs of every prompt and response
#[derive(Debug)]
pub struct InteractionLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// File holding the exchanges of `agent`
    pub fn path_for(&self, agent: &str) -> PathBuf {
        self.dir.join(format!("{agent}_interactions.json"))
    }

    /// Append a record to the agent's array.
    ///
    /// A missing or unreadable file starts a fresh array.
    pub fn append(&self, agent: &str, record: InteractionRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Other("interaction log lock poisoned".to_string()))?;

        let path = self.path_for(agent);
        let mut records: Vec<InteractionRecord> = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        records.push(record);

        fs::create_dir_all(&self.dir).map_err(|e| write_error(&self.dir, e))?;
        write_json(&path, &records)
    }

    /// Read back the records of `agent`
    pub fn records(&self, agent: &str) -> Result<Vec<InteractionRecord>> {
        let path = self.path_for(agent);
        let content = read_or_empty(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

fn write_error(path: &Path, err: std::io::Error) -> Error {
    Error::LogWriteFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn open_append(path: &Path) -> Result<fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| write_error(path, e))
}

/// Append `[timestamp] line` as a single write
fn append_line(path: &Path, line: &str) -> Result<()> {
    let entry = format!("[{}] {}\n", clock_timestamp(), line);
    open_append(path)?
        .write_all(entry.as_bytes())
        .map_err(|e| write_error(path, e))
}

/// Rewrite a JSON document through a temporary file and a rename
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| write_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| write_error(path, e))
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(Error::Io(e)),
    }
}
