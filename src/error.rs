//! Error types and Result aliases for fiction-pilot

use std::fmt;
use std::path::PathBuf;

/// Result type alias for fiction-pilot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fiction-pilot
#[derive(Debug)]
pub enum Error {
    // === Startup errors ===
    /// Game data file does not exist
    GameFileNotFound {
        path: PathBuf,
    },

    /// Interpreter binary could not be found
    InterpreterNotFound {
        program: String,
    },

    /// Failed to create PTY
    PtyCreationFailed {
        command: String,
        reason: String,
    },

    /// Failed to spawn the interpreter in the PTY
    CommandSpawnFailed {
        command: String,
        reason: String,
    },

    /// Failed to clone PTY reader
    PtyReaderCloneFailed {
        reason: String,
    },

    /// Failed to take PTY writer
    PtyWriterTakeFailed {
        reason: String,
    },

    // === Session errors ===
    /// Write to the PTY master failed
    PtyWriteFailed {
        reason: String,
    },

    /// Operation requires a live session
    SessionNotAlive,

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    // === Persistence errors ===
    /// Appending to a session log failed
    LogWriteFailed {
        path: PathBuf,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Startup errors
            Error::GameFileNotFound { path } => {
                write!(f, "Game file '{}' not found", path.display())
            }
            Error::InterpreterNotFound { program } => {
                write!(f, "Interpreter '{}' not found", program)
            }
            Error::PtyCreationFailed { command, reason } => {
                write!(f, "Failed to create PTY for command '{}': {}", command, reason)
            }
            Error::CommandSpawnFailed { command, reason } => {
                write!(f, "Failed to spawn command '{}': {}", command, reason)
            }
            Error::PtyReaderCloneFailed { reason } => {
                write!(f, "Failed to clone PTY reader: {}", reason)
            }
            Error::PtyWriterTakeFailed { reason } => {
                write!(f, "Failed to take PTY writer: {}", reason)
            }

            // Session errors
            Error::PtyWriteFailed { reason } => {
                write!(f, "Failed to write to PTY: {}", reason)
            }
            Error::SessionNotAlive => {
                write!(f, "Game session is not alive")
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigParseFailed { path, reason } => {
                write!(f, "Failed to parse config '{}': {}", path.display(), reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }

            // Persistence errors
            Error::LogWriteFailed { path, reason } => {
                write!(f, "Failed to write log '{}': {}", path.display(), reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}
