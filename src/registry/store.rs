//! Client registry implementation
//!
//! Owned by the relay loop and only ever touched between multiplexer waits,
//! so there is no locking.

use std::collections::HashMap;

use crate::protocol::ClientId;

use super::entry::ClientRecord;
use super::error::RegistryError;

/// Append-only table of client records
#[derive(Debug)]
pub struct ClientRegistry<E> {
    /// Every record ever created, in registration order
    records: Vec<ClientRecord<E>>,

    /// Index of the active record for each identifier
    active: HashMap<ClientId, usize>,
}

impl<E> ClientRegistry<E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            active: HashMap::new(),
        }
    }

    /// Add an active record and return its index
    ///
    /// Fails if an active record already uses `id`. The endpoint is dropped
    /// (closing its handles) in that case.
    pub fn insert(&mut self, id: ClientId, endpoint: E) -> Result<usize, RegistryError> {
        if self.active.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        let index = self.records.len();
        self.active.insert(id.clone(), index);
        self.records.push(ClientRecord::new(id, endpoint));

        tracing::debug!(
            client = %self.records[index].id(),
            index = index,
            active = self.active.len(),
            "Client record added"
        );

        Ok(index)
    }

    /// Mark a record disconnected and close its handles
    ///
    /// Returns true if the record was active. Deactivating an inactive record
    /// is a no-op.
    pub fn deactivate(&mut self, index: usize) -> Result<bool, RegistryError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(RegistryError::IndexOutOfRange(index))?;

        if !record.disconnect() {
            return Ok(false);
        }
        self.active.remove(record.id());

        tracing::debug!(
            client = %record.id(),
            index = index,
            active = self.active.len(),
            "Client record deactivated"
        );

        Ok(true)
    }

    /// Index of the active record for `id`
    pub fn find_active(&self, id: &str) -> Option<usize> {
        self.active.get(id).copied()
    }

    /// Whether an active record uses `id`
    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    /// Record at `index`, active or not
    pub fn get(&self, index: usize) -> Option<&ClientRecord<E>> {
        self.records.get(index)
    }

    /// Mutable record at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ClientRecord<E>> {
        self.records.get_mut(index)
    }

    /// Active records with their indices, in ascending index order
    pub fn active(&self) -> impl Iterator<Item = (usize, &ClientRecord<E>)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_active())
    }

    /// Every record, including disconnected ones
    pub fn records(&self) -> &[ClientRecord<E>] {
        &self.records
    }

    /// Indices of the active records a message from `sender` goes to
    ///
    /// Never contains `sender` itself, nor any record sharing its identifier.
    pub fn relay_targets(&self, sender: usize) -> Vec<usize> {
        let Some(sender_id) = self.records.get(sender).map(|r| r.id()) else {
            return Vec::new();
        };

        self.active()
            .filter(|(index, record)| *index != sender && record.id() != sender_id)
            .map(|(index, _)| index)
            .collect()
    }

    /// Total number of records, including tombstones
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no client ever registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of active records
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl<E> Default for ClientRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::entry::ClientState;

    fn id(s: &str) -> ClientId {
        ClientId::new(s).unwrap()
    }

    #[test]
    fn test_insert_assigns_stable_indices() {
        let mut registry = ClientRegistry::new();

        assert_eq!(registry.insert(id("alice"), ()).unwrap(), 0);
        assert_eq!(registry.insert(id("bob"), ()).unwrap(), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.active_count(), 2);
        assert_eq!(registry.find_active("bob"), Some(1));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ClientRegistry::new();
        registry.insert(id("alice"), ()).unwrap();

        let result = registry.insert(id("alice"), ());
        assert_eq!(result, Err(RegistryError::DuplicateId(id("alice"))));
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deactivate_is_terminal() {
        let mut registry = ClientRegistry::new();
        let index = registry.insert(id("alice"), ()).unwrap();

        assert_eq!(registry.deactivate(index), Ok(true));
        let record = registry.get(index).unwrap();
        assert_eq!(record.state(), ClientState::Disconnected);
        assert!(record.disconnected_at.is_some());
        assert!(record.endpoint().is_none());

        // Second deactivation changes nothing
        assert_eq!(registry.deactivate(index), Ok(false));
        assert!(!registry.get(index).unwrap().is_active());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_deactivate_out_of_range() {
        let mut registry: ClientRegistry<()> = ClientRegistry::new();
        assert_eq!(
            registry.deactivate(3),
            Err(RegistryError::IndexOutOfRange(3))
        );
    }

    #[test]
    fn test_reregistration_appends_new_record() {
        let mut registry = ClientRegistry::new();
        let first = registry.insert(id("alice"), ()).unwrap();
        registry.deactivate(first).unwrap();

        let second = registry.insert(id("alice"), ()).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
        assert!(!registry.get(first).unwrap().is_active());
        assert!(registry.get(second).unwrap().is_active());
        assert_eq!(registry.find_active("alice"), Some(second));
    }

    #[test]
    fn test_relay_targets_exclude_sender_and_inactive() {
        let mut registry = ClientRegistry::new();
        let alice = registry.insert(id("alice"), ()).unwrap();
        let bob = registry.insert(id("bob"), ()).unwrap();
        let carol = registry.insert(id("carol"), ()).unwrap();
        let dave = registry.insert(id("dave"), ()).unwrap();
        registry.deactivate(dave).unwrap();

        assert_eq!(registry.relay_targets(bob), vec![alice, carol]);
        assert_eq!(registry.relay_targets(alice), vec![bob, carol]);
        assert!(registry.relay_targets(99).is_empty());
    }

    #[test]
    fn test_active_iterates_in_index_order() {
        let mut registry = ClientRegistry::new();
        for name in ["a", "b", "c", "d"] {
            registry.insert(id(name), ()).unwrap();
        }
        registry.deactivate(1).unwrap();

        let indices: Vec<usize> = registry.active().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2, 3]);
    }
}
