//! Error types
//!
//! Only [`Error`] ever reaches the caller of the relay loop, and only when the
//! rendezvous channel cannot be set up. Everything else is scoped to a single
//! client, logged, and absorbed by the loop.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;

use crate::protocol::ClientId;
use crate::registry::RegistryError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug)]
pub enum Error {
    /// I/O failure outside a client channel
    Io(io::Error),
    /// Rendezvous channel could not be created or opened
    Channel(ChannelError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Channel(e) => write!(f, "Channel error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Channel(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ChannelError> for Error {
    fn from(err: ChannelError) -> Self {
        Error::Channel(err)
    }
}

/// Why a raw identifier was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Nothing left after stripping terminators
    Empty,
    /// Longer than the configured maximum
    TooLong { len: usize, max: usize },
    /// Not valid UTF-8
    NotUtf8,
    /// Contains a path separator, whitespace or a control character
    InvalidChar(char),
    /// `.` or `..`
    Reserved(String),
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::Empty => write!(f, "empty identifier"),
            IdError::TooLong { len, max } => {
                write!(f, "identifier is {} bytes, limit is {}", len, max)
            }
            IdError::NotUtf8 => write!(f, "identifier is not valid UTF-8"),
            IdError::InvalidChar(c) => write!(f, "identifier contains {:?}", c),
            IdError::Reserved(name) => write!(f, "identifier {:?} is reserved", name),
        }
    }
}

impl std::error::Error for IdError {}

/// Failure creating or opening a FIFO
#[derive(Debug)]
pub enum ChannelError {
    /// `mkfifo` (or removing a stale file) failed
    Create { path: PathBuf, errno: Errno },
    /// Opening an end of the FIFO failed
    Open { path: PathBuf, source: io::Error },
    /// Nobody opened the read end before the deadline
    PeerNotReady { path: PathBuf, waited: Duration },
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Create { path, errno } => {
                write!(f, "Failed to create FIFO {}: {}", path.display(), errno)
            }
            ChannelError::Open { path, source } => {
                write!(f, "Failed to open FIFO {}: {}", path.display(), source)
            }
            ChannelError::PeerNotReady { path, waited } => write!(
                f,
                "No reader on {} after {}ms",
                path.display(),
                waited.as_millis()
            ),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Create { errno, .. } => Some(errno),
            ChannelError::Open { source, .. } => Some(source),
            ChannelError::PeerNotReady { .. } => None,
        }
    }
}

/// Why a registration did not produce a client record
#[derive(Debug)]
pub enum RegistrationError {
    /// Identifier failed validation
    InvalidId(IdError),
    /// An active client already holds this identifier
    Duplicate(ClientId),
    /// Active client limit reached
    CapacityReached { max: usize },
    /// Per-client FIFO pair could not be set up
    Channel { id: ClientId, source: ChannelError },
    /// The readiness marker could not be delivered
    ReadyMarker { id: ClientId, source: io::Error },
    /// The registry refused the record
    Registry(RegistryError),
}

impl RegistrationError {
    /// Whether the request was refused by policy rather than failing midway
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RegistrationError::InvalidId(_)
                | RegistrationError::Duplicate(_)
                | RegistrationError::CapacityReached { .. }
        )
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidId(e) => write!(f, "Invalid identifier: {}", e),
            RegistrationError::Duplicate(id) => write!(f, "Client already active: {}", id),
            RegistrationError::CapacityReached { max } => {
                write!(f, "Client limit reached ({})", max)
            }
            RegistrationError::Channel { id, source } => {
                write!(f, "Channel setup failed for {}: {}", id, source)
            }
            RegistrationError::ReadyMarker { id, source } => {
                write!(f, "Failed to send ready marker to {}: {}", id, source)
            }
            RegistrationError::Registry(e) => write!(f, "Registry error: {}", e),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationError::InvalidId(e) => Some(e),
            RegistrationError::Channel { source, .. } => Some(source),
            RegistrationError::ReadyMarker { source, .. } => Some(source),
            RegistrationError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IdError> for RegistrationError {
    fn from(err: IdError) -> Self {
        RegistrationError::InvalidId(err)
    }
}

impl From<RegistryError> for RegistrationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(id) => RegistrationError::Duplicate(id),
            other => RegistrationError::Registry(other),
        }
    }
}
