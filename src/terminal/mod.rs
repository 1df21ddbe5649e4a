//! Terminal output handling
//!
//! Segmentation of the interpreter's output into updates, and the
//! predicates that decide when a turn has ended.

pub mod boundary;
pub mod output;

// Re-exports for convenience
pub use boundary::{PromptBoundary, QuiescenceBoundary, TurnBoundary};
pub use output::{reconstruct, OutputSegmenter, CONTINUATION_MARKER};
