//! Registry error types

use crate::protocol::ClientId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An active record already uses this identifier
    DuplicateId(ClientId),
    /// No record at this index
    IndexOutOfRange(usize),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateId(id) => write!(f, "Client already active: {}", id),
            RegistryError::IndexOutOfRange(index) => write!(f, "No client at index {}", index),
        }
    }
}

impl std::error::Error for RegistryError {}
