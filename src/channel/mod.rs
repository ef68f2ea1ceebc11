//! Client channels
//!
//! The relay engine never touches file descriptors directly. It sees three
//! seams:
//!
//! - [`ReadReady`]: something the multiplexer can wait on and read one chunk from
//! - [`ClientEndpoint`]: a client's read end plus its write end
//! - [`EndpointFactory`]: creates the rendezvous channel and per-client endpoints
//!
//! [`fifo`] implements them with named FIFOs. Tests use an in-memory double.

use std::future::Future;
use std::io;
use std::task::{Context, Poll};

use crate::error::ChannelError;
use crate::protocol::ClientId;

pub mod fifo;
#[cfg(test)]
pub(crate) mod memory;

pub use fifo::{FifoEndpoint, FifoFactory, RendezvousChannel};

/// A readable handle the multiplexer can watch
pub trait ReadReady {
    /// Poll for read readiness (data available, end-of-stream, or error)
    fn poll_read_ready(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>>;

    /// Read at most `buf.len()` bytes without blocking
    ///
    /// `Ok(0)` means end-of-stream. `WouldBlock` means the readiness was
    /// spurious.
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Both halves of a registered client's channel
///
/// Dropping the endpoint closes both handles.
pub trait ClientEndpoint: ReadReady {
    /// Write to the client without blocking
    ///
    /// `WouldBlock` means the client is not draining its channel.
    fn try_write(&self, data: &[u8]) -> io::Result<usize>;
}

/// Creates the channels the relay runs on
pub trait EndpointFactory {
    /// Per-client endpoint type
    type Endpoint: ClientEndpoint;

    /// Rendezvous channel type
    type Rendezvous: ReadReady;

    /// Create and open the well-known rendezvous channel
    fn open_rendezvous(&self) -> Result<Self::Rendezvous, ChannelError>;

    /// Create and open the channel pair for a client
    ///
    /// On error nothing opened along the way stays open.
    fn open_client(
        &self,
        id: &ClientId,
    ) -> impl Future<Output = Result<Self::Endpoint, ChannelError>>;
}

/// Deliver a whole message in a single non-blocking write
///
/// Pipe writes of at most
/// [`ATOMIC_WRITE_MAX`](crate::protocol::constants::ATOMIC_WRITE_MAX) bytes
/// land entirely or not at all, so a full channel surfaces as `WouldBlock`
/// and never as a torn message. A short write is reported as `WriteZero`.
pub fn deliver<E: ClientEndpoint>(endpoint: &E, data: &[u8]) -> io::Result<()> {
    let written = endpoint.try_write(data)?;
    if written == data.len() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {} of {} bytes", written, data.len()),
        ))
    }
}
