//! Client record
//!
//! A record owns its client's endpoint for as long as the client is active.
//! Deactivation drops the endpoint, which closes both handles, and the record
//! can never hold an endpoint again.

use std::time::Instant;

use crate::protocol::ClientId;

/// State of a client record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Registered, handles open
    Active,
    /// End-of-stream seen, handles closed
    Disconnected,
}

/// Entry for a single client in the registry
#[derive(Debug)]
pub struct ClientRecord<E> {
    /// Client identifier
    id: ClientId,

    /// Read and write handles; `None` once disconnected
    endpoint: Option<E>,

    /// When the client registered
    pub registered_at: Instant,

    /// When end-of-stream was observed
    pub disconnected_at: Option<Instant>,

    /// Messages read from this client
    pub messages_sent: u64,

    /// Bytes read from this client
    pub bytes_sent: u64,
}

impl<E> ClientRecord<E> {
    pub(super) fn new(id: ClientId, endpoint: E) -> Self {
        Self {
            id,
            endpoint: Some(endpoint),
            registered_at: Instant::now(),
            disconnected_at: None,
            messages_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Client identifier
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Whether the client is still connected
    pub fn is_active(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Current state
    pub fn state(&self) -> ClientState {
        if self.is_active() {
            ClientState::Active
        } else {
            ClientState::Disconnected
        }
    }

    /// Endpoint of an active client
    pub fn endpoint(&self) -> Option<&E> {
        self.endpoint.as_ref()
    }

    /// Account one message read from this client
    pub fn record_message(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Release the endpoint; returns false if already disconnected
    pub(super) fn disconnect(&mut self) -> bool {
        match self.endpoint.take() {
            Some(endpoint) => {
                drop(endpoint);
                self.disconnected_at = Some(Instant::now());
                true
            }
            None => false,
        }
    }
}
