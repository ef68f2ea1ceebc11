//! Protocol constants

use std::time::Duration;

/// Marker written once to a newly registered client
pub const READY_MARKER: &[u8] = b"READY\n";

/// Maximum identifier length in bytes (terminator excluded)
pub const MAX_ID_LEN: usize = 49;

/// Maximum number of bytes relayed per read
pub const MAX_MESSAGE_SIZE: usize = 256;

/// Largest write a pipe is guaranteed to take atomically
///
/// POSIX `_POSIX_PIPE_BUF`. Relay chunks never exceed it, so a non-blocking
/// write to a client either lands whole or fails with `WouldBlock`.
pub const ATOMIC_WRITE_MAX: usize = 512;

/// Size of a single read on the rendezvous channel
///
/// Larger than [`MAX_ID_LEN`] so an over-long identifier is consumed in one
/// read and rejected, instead of leaving a tail that looks like a second id.
pub const RENDEZVOUS_READ_SIZE: usize = 256;

/// Default rendezvous FIFO name inside the base directory
pub const DEFAULT_RENDEZVOUS_NAME: &str = "registration_fifo";

/// Suffix of the client-to-server FIFO (`<id>_to_server`)
pub const INBOUND_SUFFIX: &str = "_to_server";

/// Prefix of the server-to-client FIFO (`server_to_<id>`)
pub const OUTBOUND_PREFIX: &str = "server_to_";

/// Default multiplexer wait timeout
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Default permission bits for created FIFOs (before umask)
pub const DEFAULT_FIFO_MODE: u32 = 0o666;
