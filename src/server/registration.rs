//! Registration handler
//!
//! Turns one rendezvous read into a client record:
//!
//! 1. Parse and validate the identifier
//! 2. Refuse identifiers held by an active client, and refuse once the
//!    active client limit is reached
//! 3. Create (or reuse) and open the client's FIFO pair
//! 4. Send the readiness marker
//! 5. Append the record to the registry
//!
//! A failure at step 3 or 4 drops everything opened so far. The client gets
//! no feedback either way; the rendezvous channel only flows into the server.
//!
//! One read is one identifier. Identifiers split across reads are not
//! reassembled, and registrations coalesced into one read are rejected.

use crate::channel::{deliver, EndpointFactory};
use crate::error::RegistrationError;
use crate::protocol::ClientId;
use crate::registry::ClientRegistry;

use super::config::RelayConfig;

/// Register a client from the raw bytes of one rendezvous read
///
/// Returns the new record's registry index.
pub async fn register<F>(
    factory: &F,
    registry: &mut ClientRegistry<F::Endpoint>,
    config: &RelayConfig,
    raw: &[u8],
) -> Result<usize, RegistrationError>
where
    F: EndpointFactory,
{
    let id = ClientId::parse(raw, config.max_id_len)?;

    // Checked before touching the filesystem: recreating the FIFOs would
    // pull the paths out from under the active client.
    if registry.is_active(id.as_str()) {
        return Err(RegistrationError::Duplicate(id));
    }

    if config.max_clients > 0 && registry.active_count() >= config.max_clients {
        return Err(RegistrationError::CapacityReached {
            max: config.max_clients,
        });
    }

    let endpoint = match factory.open_client(&id).await {
        Ok(endpoint) => endpoint,
        Err(source) => return Err(RegistrationError::Channel { id, source }),
    };

    if let Err(source) = deliver(&endpoint, &config.ready_marker) {
        drop(endpoint);
        return Err(RegistrationError::ReadyMarker { id, source });
    }

    let index = registry.insert(id, endpoint)?;

    if let Some(record) = registry.get(index) {
        tracing::info!(
            client = %record.id(),
            index = index,
            active = registry.active_count(),
            "Client registered"
        );
    }

    Ok(index)
}
