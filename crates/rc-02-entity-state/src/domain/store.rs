//! # Entity State Store
//!
//! Single source of truth for who is present. Keys are canonical
//! [`Address`] values, so lookups are case-insensitive by construction:
//! hex spellings are normalized when parsed, never at lookup time.
//!
//! The "self" marker is independent of membership. `set_self` records which
//! address is the local actor; `get_self` only returns it once an entity for
//! that address has been inserted.

use rc_telemetry::ENTITIES_PRESENT;
use shared_types::Address;
use std::collections::BTreeMap;

use super::entity::Entity;

/// Address-keyed entity map plus the self marker.
#[derive(Debug, Default)]
pub struct EntityStateStore {
    entities: BTreeMap<Address, Entity>,
    self_address: Option<Address>,
}

impl EntityStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entity for `address`.
    ///
    /// The stored entity's `address` field is forced to the key. Returns the
    /// previous entity, if any.
    pub fn upsert(&mut self, address: Address, mut entity: Entity) -> Option<Entity> {
        entity.address = address;
        let previous = self.entities.insert(address, entity);
        self.update_gauge();
        previous
    }

    pub fn find(&self, address: &Address) -> Option<&Entity> {
        self.entities.get(address)
    }

    pub fn find_mut(&mut self, address: &Address) -> Option<&mut Entity> {
        self.entities.get_mut(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entities.contains_key(address)
    }

    pub fn remove(&mut self, address: &Address) -> Option<Entity> {
        let removed = self.entities.remove(address);
        self.update_gauge();
        removed
    }

    /// Every entity, ordered by address.
    pub fn all(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Mark `address` as the local actor, or clear the marker.
    pub fn set_self(&mut self, address: Option<Address>) {
        self.self_address = address;
    }

    pub fn self_address(&self) -> Option<Address> {
        self.self_address
    }

    /// The local actor's entity, if both marked and present.
    pub fn get_self(&self) -> Option<&Entity> {
        self.self_address.and_then(|a| self.entities.get(&a))
    }

    pub fn get_self_mut(&mut self) -> Option<&mut Entity> {
        let address = self.self_address?;
        self.entities.get_mut(&address)
    }

    /// Remove all entities. The self marker stays.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.update_gauge();
    }

    fn update_gauge(&self) {
        ENTITIES_PRESENT.set(self.entities.len() as f64);
    }
}
