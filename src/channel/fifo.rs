//! Named FIFO channels
//!
//! Every channel is a pair of one-directional FIFOs on the filesystem:
//!
//! ```text
//!   <base>/registration_fifo      clients ──► server   (identifiers)
//!   <base>/<id>_to_server         client  ──► server   (messages)
//!   <base>/server_to_<id>         server  ──► client   (READY, relayed messages)
//! ```
//!
//! Read ends are opened non-blocking. The write end of `server_to_<id>` cannot
//! be opened until the client holds the read end, so it is opened
//! non-blocking too and retried until a deadline instead of parking the whole
//! relay inside `open(2)`.

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::task::{Context, Poll};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::{mkfifo, unlink};
use tokio::net::unix::pipe;
use tokio::time::Instant;

use crate::error::ChannelError;
use crate::protocol::constants::{DEFAULT_FIFO_MODE, DEFAULT_RENDEZVOUS_NAME};
use crate::protocol::ClientId;
use crate::server::config::RelayConfig;

use super::{ClientEndpoint, EndpointFactory, ReadReady};

/// Create a FIFO at `path`, replacing whatever stale file is there
pub fn create_fifo(path: &Path, mode: Mode) -> Result<(), ChannelError> {
    match unlink(path) {
        Ok(()) | Err(Errno::ENOENT) => {}
        Err(errno) => {
            return Err(ChannelError::Create {
                path: path.to_path_buf(),
                errno,
            })
        }
    }

    match mkfifo(path, mode) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(errno) => Err(ChannelError::Create {
            path: path.to_path_buf(),
            errno,
        }),
    }
}

/// Make sure a FIFO exists at `path`, keeping one that is already there
///
/// A returning client may open a FIFO left from its earlier session before
/// the relay gets to it. Replacing that FIFO would strand the client on the
/// unlinked inode, so only a non-FIFO file in the way is replaced.
pub fn ensure_fifo(path: &Path, mode: Mode) -> Result<(), ChannelError> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => Ok(()),
        _ => create_fifo(path, mode),
    }
}

fn open_reader(path: &Path) -> Result<pipe::Receiver, ChannelError> {
    pipe::OpenOptions::new()
        .open_receiver(path)
        .map_err(|source| ChannelError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Open the write end, retrying while nobody holds the read end
async fn open_writer(
    path: &Path,
    timeout: Duration,
    retry: Duration,
) -> Result<pipe::Sender, ChannelError> {
    let started = Instant::now();

    loop {
        match pipe::OpenOptions::new().open_sender(path) {
            Ok(sender) => return Ok(sender),
            Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(ChannelError::PeerNotReady {
                        path: path.to_path_buf(),
                        waited,
                    });
                }
                tokio::time::sleep(retry.min(timeout - waited)).await;
            }
            Err(source) => {
                return Err(ChannelError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

/// Creates FIFO channels under a base directory
#[derive(Debug, Clone)]
pub struct FifoFactory {
    base_dir: PathBuf,
    rendezvous_name: String,
    mode: Mode,
    writer_open_timeout: Duration,
    writer_open_retry: Duration,
}

impl FifoFactory {
    /// Create a factory rooted at `base_dir` with default settings
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            rendezvous_name: DEFAULT_RENDEZVOUS_NAME.to_string(),
            mode: Mode::from_bits_truncate(DEFAULT_FIFO_MODE),
            writer_open_timeout: Duration::from_secs(2),
            writer_open_retry: Duration::from_millis(20),
        }
    }

    /// Create a factory from relay configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            rendezvous_name: config.rendezvous_name.clone(),
            mode: Mode::from_bits_truncate(config.fifo_mode),
            writer_open_timeout: config.writer_open_timeout,
            writer_open_retry: config.writer_open_retry,
        }
    }

    /// Set how long to wait for a client to open its read end
    pub fn writer_open_timeout(mut self, timeout: Duration) -> Self {
        self.writer_open_timeout = timeout;
        self
    }

    /// Directory holding every FIFO
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the rendezvous FIFO
    pub fn rendezvous_path(&self) -> PathBuf {
        self.base_dir.join(&self.rendezvous_name)
    }

    /// Path of the client-to-server FIFO for `id`
    pub fn inbound_path(&self, id: &ClientId) -> PathBuf {
        self.base_dir.join(id.inbound_name())
    }

    /// Path of the server-to-client FIFO for `id`
    pub fn outbound_path(&self, id: &ClientId) -> PathBuf {
        self.base_dir.join(id.outbound_name())
    }
}

impl EndpointFactory for FifoFactory {
    type Endpoint = FifoEndpoint;
    type Rendezvous = RendezvousChannel;

    fn open_rendezvous(&self) -> Result<RendezvousChannel, ChannelError> {
        let path = self.rendezvous_path();
        create_fifo(&path, self.mode)?;

        let reader = open_reader(&path)?;
        // Our own writer keeps the FIFO from reporting end-of-stream every
        // time the last registering client closes it.
        let keepalive = pipe::OpenOptions::new()
            .open_sender(&path)
            .map_err(|source| ChannelError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Rendezvous FIFO open");

        Ok(RendezvousChannel {
            reader,
            _keepalive: keepalive,
            path,
        })
    }

    async fn open_client(&self, id: &ClientId) -> Result<FifoEndpoint, ChannelError> {
        let inbound = self.inbound_path(id);
        let outbound = self.outbound_path(id);

        ensure_fifo(&inbound, self.mode)?;
        ensure_fifo(&outbound, self.mode)?;

        let reader = open_reader(&inbound)?;
        let writer = open_writer(&outbound, self.writer_open_timeout, self.writer_open_retry).await?;

        tracing::debug!(
            client = %id,
            inbound = %inbound.display(),
            outbound = %outbound.display(),
            "Client FIFOs open"
        );

        Ok(FifoEndpoint { reader, writer })
    }
}

/// The well-known registration FIFO
///
/// Removes its FIFO from the filesystem when dropped.
#[derive(Debug)]
pub struct RendezvousChannel {
    reader: pipe::Receiver,
    _keepalive: pipe::Sender,
    path: PathBuf,
}

impl RendezvousChannel {
    /// Filesystem path of the FIFO
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadReady for RendezvousChannel {
    fn poll_read_ready(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.reader.poll_read_ready(cx)
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.try_read(buf)
    }
}

impl Drop for RendezvousChannel {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// A registered client's FIFO pair
#[derive(Debug)]
pub struct FifoEndpoint {
    reader: pipe::Receiver,
    writer: pipe::Sender,
}

impl ReadReady for FifoEndpoint {
    fn poll_read_ready(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.reader.poll_read_ready(cx)
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.try_read(buf)
    }
}

impl ClientEndpoint for FifoEndpoint {
    fn try_write(&self, data: &[u8]) -> io::Result<usize> {
        self.writer.try_write(data)
    }
}
