//! In-memory index of committed entities.

use crate::model::{Entity, Shared};
use log::warn;
use std::collections::HashMap;

/// Key → shared-handle index over committed entities.
///
/// # Invariants
/// - Mutated only while the owning repository holds its writer lock.
/// - No eviction: entries live until process teardown.
pub struct EntityCache<T: Entity> {
    map: HashMap<T::Key, Shared<T>>,
}

impl<T: Entity> EntityCache<T> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Inserts or replaces the entry for the entity's key.
    ///
    /// Entities without an assigned key cannot be indexed; the store is
    /// expected to have assigned one during flush, so a miss here is logged
    /// rather than propagated.
    pub fn update(&mut self, entity: &Shared<T>) {
        match entity.read().key() {
            Some(key) => {
                self.map.insert(key, entity.clone());
            }
            None => {
                warn!("event=cache_update module=repo status=skipped reason=missing_key");
            }
        }
    }

    pub fn get(&self, key: T::Key) -> Option<Shared<T>> {
        self.map.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<T: Entity> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
