//! Output Segmentation
//!
//! Splits the raw byte stream coming out of the PTY into ordered
//! [`Update`]s. An update closes on a newline, on the continuation marker
//! (which games print without a trailing newline), or on a forced flush.
//!
//! Concatenating every update's raw text followed by its terminator's
//! suffix reproduces the decoded stream exactly.

use crate::models::{Terminator, Update};

/// Literal printed by games that want a keypress before continuing
pub const CONTINUATION_MARKER: &str = "***MORE***";

/// Incremental segmenter for one session's output
#[derive(Debug)]
pub struct OutputSegmenter {
    /// Text received since the last emitted update
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    carry: Vec<u8>,
    /// Marker that closes an update without a newline
    marker: String,
    /// Sequence number of the next update
    next_sequence: u64,
    /// Total bytes accepted
    bytes_fed: u64,
}

impl OutputSegmenter {
    /// Create a segmenter for the standard continuation marker
    pub fn new() -> Self {
        Self::with_marker(CONTINUATION_MARKER)
    }

    /// Create a segmenter with a custom continuation marker
    pub fn with_marker(marker: &str) -> Self {
        Self {
            pending: String::new(),
            carry: Vec::new(),
            marker: marker.to_string(),
            next_sequence: 0,
            bytes_fed: 0,
        }
    }

    /// Feed a chunk of raw bytes and return the updates it completes.
    ///
    /// Malformed bytes are replaced with U+FFFD. A multi-byte character
    /// split across two chunks is held back until its tail arrives.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Update> {
        self.bytes_fed += chunk.len() as u64;

        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);
        let text = self.decode_keeping_tail(bytes);

        let mut updates = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                updates.push(self.emit(Terminator::Newline));
                continue;
            }

            self.pending.push(ch);
            if !self.marker.is_empty() && self.pending.ends_with(&self.marker) {
                updates.push(self.emit(Terminator::Continuation));
            }
        }

        updates
    }

    /// Emit whatever is pending as a final update.
    ///
    /// With `force` the pending text is emitted even when it is only
    /// whitespace; without it whitespace-only text stays buffered.
    /// Returns `None` when there is nothing to emit.
    pub fn flush(&mut self, force: bool) -> Option<Update> {
        if !self.carry.is_empty() && force {
            let tail = std::mem::take(&mut self.carry);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }

        if self.pending.is_empty() {
            return None;
        }
        if !force && self.pending.trim().is_empty() {
            return None;
        }

        Some(self.emit(Terminator::Flush))
    }

    /// Text waiting for a boundary
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Check if anything is buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.carry.is_empty()
    }

    /// Number of updates emitted so far
    pub fn emitted_count(&self) -> u64 {
        self.next_sequence
    }

    /// Total bytes fed so far
    pub fn bytes_fed(&self) -> u64 {
        self.bytes_fed
    }

    fn emit(&mut self, terminator: Terminator) -> Update {
        let raw = std::mem::take(&mut self.pending);
        let update = Update::new(self.next_sequence, raw, terminator);
        self.next_sequence += 1;
        update
    }

    /// Decode lossily, keeping an incomplete trailing sequence in `carry`
    fn decode_keeping_tail(&mut self, bytes: Vec<u8>) -> String {
        match std::str::from_utf8(&bytes) {
            Ok(_) => String::from_utf8(bytes).unwrap_or_default(),
            Err(e) if e.error_len().is_none() => {
                let valid_up_to = e.valid_up_to();
                let mut decoded = String::from_utf8_lossy(&bytes[..valid_up_to]).into_owned();
                let tail = &bytes[valid_up_to..];
                // A tail longer than any UTF-8 sequence cannot complete.
                if tail.len() >= 4 {
                    decoded.push_str(&String::from_utf8_lossy(tail));
                } else {
                    self.carry = tail.to_vec();
                }
                decoded
            }
            Err(_) => {
                // Invalid bytes in the middle; decode up to the last possible
                // incomplete sequence and keep that for the next chunk.
                let split = incomplete_tail_start(&bytes);
                self.carry = bytes[split..].to_vec();
                String::from_utf8_lossy(&bytes[..split]).into_owned()
            }
        }
    }
}

impl Default for OutputSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Index where a trailing, still-incomplete UTF-8 sequence starts
fn incomplete_tail_start(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=3.min(len) {
        let idx = len - back;
        let byte = bytes[idx];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let needed = if byte & 0b1110_0000 == 0b1100_0000 {
            2
        } else if byte & 0b1111_0000 == 0b1110_0000 {
            3
        } else if byte & 0b1111_1000 == 0b1111_0000 {
            4
        } else {
            return len;
        };
        return if back < needed { idx } else { len };
    }
    len
}

/// Rebuild the decoded stream from emitted updates
pub fn reconstruct(updates: &[Update]) -> String {
    let mut out = String::new();
    for update in updates {
        out.push_str(&update.raw);
        out.push_str(update.terminator.suffix());
    }
    out
}
