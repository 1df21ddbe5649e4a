//! PTY Streams
//!
//! Bridges the blocking PTY master reader to async code. A background
//! thread reads bounded chunks and forwards them over an unbounded channel;
//! the channel closing is the end-of-stream signal.

use std::io::Read;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Default size of a single PTY read
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Result of waiting for output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A chunk of bytes arrived
    Data(Vec<u8>),
    /// Nothing arrived before the deadline
    TimedOut,
    /// The reader thread finished; no more output will arrive
    Closed,
}

/// Receiving side of the PTY output bridge
pub struct PtyOutput {
    output_rx: UnboundedReceiver<Vec<u8>>,
    stats: StreamStats,
}

impl PtyOutput {
    /// Wrap an existing channel
    pub fn from_channel(output_rx: UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            output_rx,
            stats: StreamStats::default(),
        }
    }

    /// Start a reader thread over `reader` and return the receiving side
    pub fn spawn_reader(reader: Box<dyn Read + Send>, chunk_size: usize) -> Self {
        let (tx, rx) = unbounded_channel::<Vec<u8>>();
        let chunk_size = chunk_size.max(1);

        thread::spawn(move || {
            let mut reader = reader;
            let mut buf = vec![0u8; chunk_size];
            let mut consecutive_errors = 0;
            const MAX_CONSECUTIVE_ERRORS: u32 = 5;

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("PTY read EOF - interpreter closed its terminal");
                        break;
                    }
                    Ok(n) => {
                        consecutive_errors = 0;
                        if tx.send(buf[..n].to_vec()).is_err() {
                            debug!("PTY read: receiver dropped, stopping reader thread");
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(e) if is_hangup(&e) => {
                        debug!("PTY read EIO - slave side closed");
                        break;
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        warn!(
                            "PTY read error ({}): {} (attempt {}/{})",
                            e.kind(),
                            e,
                            consecutive_errors,
                            MAX_CONSECUTIVE_ERRORS
                        );
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            error!("PTY read: too many consecutive errors, stopping reader thread");
                            break;
                        }
                        thread::sleep(Duration::from_millis(50));
                    }
                }
            }
            debug!("PTY reader thread exiting");
        });

        Self::from_channel(rx)
    }

    /// Wait up to `timeout` for the next chunk
    pub async fn read_with_timeout(&mut self, timeout: Duration) -> ReadOutcome {
        match tokio::time::timeout(timeout, self.output_rx.recv()).await {
            Ok(Some(bytes)) => {
                self.stats.record_read(bytes.len());
                ReadOutcome::Data(bytes)
            }
            Ok(None) => ReadOutcome::Closed,
            Err(_) => {
                self.stats.read_timeouts += 1;
                ReadOutcome::TimedOut
            }
        }
    }

    /// Take a chunk that is already queued, without waiting.
    ///
    /// Returns `None` when nothing is queued and the reader is still running.
    pub fn try_read_now(&mut self) -> Option<ReadOutcome> {
        match self.output_rx.try_recv() {
            Ok(bytes) => {
                self.stats.record_read(bytes.len());
                Some(ReadOutcome::Data(bytes))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(ReadOutcome::Closed),
        }
    }

    /// Count a write made through the session's writer
    pub fn record_write(&mut self, len: usize) {
        self.stats.record_write(len);
    }

    /// I/O counters for this stream
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

#[cfg(unix)]
fn is_hangup(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::EIO as i32)
}

#[cfg(not(unix))]
fn is_hangup(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::BrokenPipe
}

/// Stream statistics for diagnostics
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Total bytes read
    pub bytes_read: u64,
    /// Total bytes written
    pub bytes_written: u64,
    /// Number of chunks read
    pub read_operations: u64,
    /// Number of commands written
    pub write_operations: u64,
    /// Number of waits that ended without data
    pub read_timeouts: u64,
}

impl StreamStats {
    fn record_read(&mut self, len: usize) {
        self.bytes_read += len as u64;
        self.read_operations += 1;
    }

    /// Record a completed write
    pub fn record_write(&mut self, len: usize) {
        self.bytes_written += len as u64;
        self.write_operations += 1;
    }

    /// Average chunk size
    pub fn read_throughput(&self) -> f64 {
        if self.read_operations == 0 {
            0.0
        } else {
            self.bytes_read as f64 / self.read_operations as f64
        }
    }
}
