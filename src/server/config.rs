//! Relay configuration

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

use crate::protocol::constants::*;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Directory holding the rendezvous and client FIFOs
    pub base_dir: PathBuf,

    /// File name of the rendezvous FIFO inside `base_dir`
    pub rendezvous_name: String,

    /// Multiplexer wait timeout
    pub poll_timeout: Duration,

    /// Maximum bytes relayed per read (at most `ATOMIC_WRITE_MAX`)
    pub max_message_size: usize,

    /// Maximum identifier length in bytes
    pub max_id_len: usize,

    /// Marker sent to a client once its channels are open
    pub ready_marker: Bytes,

    /// How long registration waits for a client to open its read end
    pub writer_open_timeout: Duration,

    /// Delay between attempts to open a client's write end
    pub writer_open_retry: Duration,

    /// Maximum concurrently active clients (0 = unlimited)
    pub max_clients: usize,

    /// Permission bits for created FIFOs
    pub fifo_mode: u32,

    /// Stats log interval (zero disables periodic logging)
    pub stats_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("fifo-relay"),
            rendezvous_name: DEFAULT_RENDEZVOUS_NAME.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            max_message_size: MAX_MESSAGE_SIZE,
            max_id_len: MAX_ID_LEN,
            ready_marker: Bytes::from_static(READY_MARKER),
            writer_open_timeout: Duration::from_secs(2),
            writer_open_retry: Duration::from_millis(20),
            max_clients: 0, // Unlimited
            fifo_mode: DEFAULT_FIFO_MODE,
            stats_interval: Duration::from_secs(60),
        }
    }
}

impl RelayConfig {
    /// Create a new config rooted at `base_dir`
    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Set the base directory
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Set the rendezvous FIFO name
    pub fn rendezvous_name(mut self, name: impl Into<String>) -> Self {
        self.rendezvous_name = name.into();
        self
    }

    /// Set the multiplexer wait timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the relay chunk size
    ///
    /// Clamped to `1..=ATOMIC_WRITE_MAX` so every relayed chunk is a single
    /// atomic pipe write.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size.clamp(1, ATOMIC_WRITE_MAX);
        self
    }

    /// Set the identifier length limit
    pub fn max_id_len(mut self, len: usize) -> Self {
        self.max_id_len = len;
        self
    }

    /// Set the writer open deadline
    pub fn writer_open_timeout(mut self, timeout: Duration) -> Self {
        self.writer_open_timeout = timeout;
        self
    }

    /// Set the active client limit
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the stats log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Path of the rendezvous FIFO
    pub fn rendezvous_path(&self) -> PathBuf {
        self.base_dir.join(&self.rendezvous_name)
    }
}
