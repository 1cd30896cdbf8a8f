//! In-memory store backend.
//!
//! # Responsibility
//! - Provide a hash-map-backed `Store` for embedding and protocol tests.
//! - Expose flush/row observability the commit tests assert against.

use crate::model::{Entity, Shared};
use crate::store::{Store, StoreError, StoreResult};
use std::collections::{HashMap, HashSet};

enum Pending<T> {
    Insert(Shared<T>),
    Update(Shared<T>),
}

/// Hash-map-backed store with sequential key assignment.
///
/// Mirrors the SQLite backend's contract: nothing is durable before `flush`,
/// and keys materialize only when the flush succeeds.
pub struct MemoryStore<T: Entity<Key = i64>> {
    rows: HashMap<i64, T>,
    pending: Vec<Pending<T>>,
    tracked: HashSet<i64>,
    next_key: i64,
    flushes: u64,
    fail_next_flush: bool,
}

impl<T: Entity<Key = i64>> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            pending: Vec::new(),
            tracked: HashSet::new(),
            next_key: 1,
            flushes: 0,
            fail_next_flush: false,
        }
    }

    /// Number of `flush` calls observed so far, successful or not.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Snapshot of the persisted row for `key`, if any.
    pub fn row(&self, key: i64) -> Option<T> {
        self.rows.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_tracked(&self, key: i64) -> bool {
        self.tracked.contains(&key)
    }

    /// Makes the next `flush` fail with a backend fault, leaving pending
    /// changes unapplied.
    pub fn fail_next_flush(&mut self) {
        self.fail_next_flush = true;
    }
}

impl<T: Entity<Key = i64>> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity<Key = i64>> Store<T> for MemoryStore<T> {
    fn register(&mut self, entity: &Shared<T>) -> StoreResult<()> {
        self.pending.push(Pending::Insert(entity.clone()));
        Ok(())
    }

    fn merge_onto(&mut self, original: &Shared<T>, working: &T) -> StoreResult<()> {
        {
            let mut target = original.write();
            target.merge_from(working);
        }
        if let Some(key) = original.read().key() {
            self.tracked.insert(key);
        }
        self.pending.push(Pending::Update(original.clone()));
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.flushes += 1;
        if self.fail_next_flush {
            self.fail_next_flush = false;
            return Err(StoreError::Backend("injected flush failure".to_string()));
        }

        for op in self.pending.drain(..) {
            match op {
                Pending::Insert(cell) => {
                    let key = self.next_key;
                    self.next_key += 1;
                    let mut entity = cell.write();
                    entity.set_key(key);
                    self.rows.insert(key, entity.clone());
                    self.tracked.insert(key);
                }
                Pending::Update(cell) => {
                    let entity = cell.read();
                    let key = entity.key().ok_or(StoreError::MissingKey {
                        table: "memory",
                    })?;
                    self.rows.insert(key, entity.clone());
                }
            }
        }

        Ok(())
    }

    fn detach(&mut self, entity: &Shared<T>) {
        if let Some(key) = entity.read().key() {
            self.tracked.remove(&key);
        }
    }
}
