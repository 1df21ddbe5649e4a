//! Pseudoterminal (PTY) Management
//!
//! Spawning the interpreter, bridging its output to async code, and the
//! session controller that owns both.

pub mod operations;
pub mod process;
pub mod session;
pub mod streams;

// Re-exports for convenience
pub use operations::{GameTerminal, PollResult};
pub use process::{resolve_interpreter, spawn_game, validate_game_file, SpawnConfig, SpawnedGame};
pub use session::PtySession;
pub use streams::{PtyOutput, ReadOutcome, StreamStats, DEFAULT_CHUNK_SIZE};
