//! Broadcast dispatcher
//!
//! Handles a readable client: one bounded read, then either a fan-out of the
//! chunk to every other active client or, on end-of-stream, deactivation of
//! the sender.
//!
//! A chunk is whatever one read returned, at most `max_message_size` bytes.
//! A larger logical message reaches recipients as several chunks, in order,
//! across loop iterations. There is no framing to put them back together.
//!
//! Writes to recipients never block. A recipient whose channel is full, or
//! whose write fails, misses the chunk: the failure is logged and skipped. It
//! does not deactivate that recipient; only end-of-stream on the recipient's
//! own read end does.

use bytes::{Bytes, BytesMut};

use crate::channel::{deliver, ClientEndpoint};
use crate::registry::ClientRegistry;

use super::config::RelayConfig;

/// What handling one readable client amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A chunk was read and offered to every other active client
    Relayed {
        /// Chunk size
        bytes: usize,
        /// Recipients written successfully
        delivered: usize,
        /// Recipients whose write failed
        failed: usize,
    },
    /// The client hung up (or its read end broke) and was deactivated
    Disconnected,
    /// Nothing to read, or the record is no longer active
    Spurious,
}

/// Handle a readable event on the client at `index`
pub fn on_readable<E: ClientEndpoint>(
    registry: &mut ClientRegistry<E>,
    index: usize,
    config: &RelayConfig,
) -> DispatchOutcome {
    let mut buf = BytesMut::zeroed(config.max_message_size);

    let read = match registry.get(index).and_then(|record| record.endpoint()) {
        Some(endpoint) => endpoint.try_read(&mut buf),
        None => return DispatchOutcome::Spurious,
    };

    match read {
        Ok(0) => {
            disconnect(registry, index);
            DispatchOutcome::Disconnected
        }
        Ok(n) => {
            buf.truncate(n);
            relay(registry, index, buf.freeze())
        }
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
            ) =>
        {
            DispatchOutcome::Spurious
        }
        Err(e) => {
            if let Some(record) = registry.get(index) {
                tracing::warn!(client = %record.id(), error = %e, "Read failed, dropping client");
            }
            disconnect(registry, index);
            DispatchOutcome::Disconnected
        }
    }
}

/// Write `message` from `sender` to every other active client
fn relay<E: ClientEndpoint>(
    registry: &mut ClientRegistry<E>,
    sender: usize,
    message: Bytes,
) -> DispatchOutcome {
    let Some(record) = registry.get_mut(sender) else {
        return DispatchOutcome::Spurious;
    };
    record.record_message(message.len());
    let sender_id = record.id().clone();

    tracing::debug!(
        client = %sender_id,
        bytes = message.len(),
        payload = %String::from_utf8_lossy(&message),
        "Message received"
    );

    let mut delivered = 0;
    let mut failed = 0;

    for target in registry.relay_targets(sender) {
        let Some(record) = registry.get(target) else {
            continue;
        };
        let Some(endpoint) = record.endpoint() else {
            continue;
        };

        match deliver(endpoint, &message) {
            Ok(()) => delivered += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    from = %sender_id,
                    to = %record.id(),
                    error = %e,
                    "Relay write failed"
                );
            }
        }
    }

    DispatchOutcome::Relayed {
        bytes: message.len(),
        delivered,
        failed,
    }
}

fn disconnect<E>(registry: &mut ClientRegistry<E>, index: usize) {
    let id = registry.get(index).map(|record| record.id().clone());

    if let Ok(true) = registry.deactivate(index) {
        if let Some(id) = id {
            tracing::info!(
                client = %id,
                index = index,
                active = registry.active_count(),
                "Client disconnected"
            );
        }
    }
}
