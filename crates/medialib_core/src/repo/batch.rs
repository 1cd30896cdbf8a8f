//! Batch unit of work.
//!
//! # Responsibility
//! - Hold a homogeneous pending batch (all updates or all creates) with its
//!   working → original association.
//! - Run the batch commit protocol with one amortized store flush.
//!
//! # Invariants
//! - Hook pairs fire per entity: every `before_save` precedes the critical
//!   section, every `after_save` follows the flush.
//! - The store is flushed exactly once per batch commit, regardless of size.
//! - Result order is stable: updates in construction order, then creates in
//!   construction order.

use crate::model::{shared, Entity, Shared};
use crate::repo::{CommitHooks, RepoError, RepoResult, Repository};
use crate::store::Store;
use log::{error, info};
use std::mem;
use std::time::Instant;

struct BatchEntry<T: Entity> {
    working: T,
    original: Option<Shared<T>>,
}

/// A pending batch of creates or updates against a repository.
///
/// Obtained from [`Repository::begin_batch_add`] or
/// [`Repository::begin_batch_update`]. The mode is batch-wide: update
/// batches clone every entity into a working copy tied to its original;
/// create batches treat every entity as an insert, tracked or not.
pub struct AtomicBatch<'r, T: Entity, S: Store<T>, H: CommitHooks<T>> {
    repo: &'r Repository<T, S, H>,
    entries: Vec<BatchEntry<T>>,
    spent: bool,
}

impl<'r, T: Entity, S: Store<T>, H: CommitHooks<T>> AtomicBatch<'r, T, S, H> {
    pub(crate) fn for_add(repo: &'r Repository<T, S, H>, entities: Vec<T>) -> Self {
        let entries = entities
            .into_iter()
            .map(|working| BatchEntry {
                working,
                original: None,
            })
            .collect();
        Self {
            repo,
            entries,
            spent: false,
        }
    }

    pub(crate) fn for_update(repo: &'r Repository<T, S, H>, originals: &[Shared<T>]) -> Self {
        let entries = originals
            .iter()
            .map(|original| BatchEntry {
                working: original.read().clone(),
                original: Some(original.clone()),
            })
            .collect();
        Self {
            repo,
            entries,
            spent: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the working copies in construction order.
    pub fn entities(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.working)
    }

    /// Mutable iteration over the working copies; no lock is held.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().map(|entry| &mut entry.working)
    }

    /// Returns the original associated with a working copy.
    ///
    /// `None` for create-mode entries, for entities not in this batch, and
    /// for working copies without an assigned key.
    pub fn original_of(&self, working: &T) -> Option<Shared<T>> {
        let key = working.key()?;
        self.entries
            .iter()
            .find(|entry| entry.working.key() == Some(key))
            .and_then(|entry| entry.original.clone())
    }

    /// Discards the batch without any store or cache mutation.
    pub fn release(&mut self) {
        self.entries.clear();
        self.spent = true;
    }

    /// Commits the whole batch under one writer-lock acquisition.
    ///
    /// Protocol: pre-commit hooks per entry (no lock) → writer lock → merge
    /// every update, register every create → one flush → cache updates →
    /// detach → unlock → post-commit hooks. Returns the committed handles:
    /// originals for updates, promoted working cells for creates.
    ///
    /// # Errors
    /// - [`RepoError::Spent`] when already committed or released.
    /// - [`RepoError::Store`] when the flush fails; the cache is untouched,
    ///   the lock is released, and no post-commit hook runs.
    pub fn commit(&mut self, params: &H::Params) -> RepoResult<Vec<Shared<T>>> {
        if self.spent {
            return Err(RepoError::Spent);
        }
        self.spent = true;
        let entries = mem::take(&mut self.entries);
        let started_at = Instant::now();

        // Pre-commit hooks in construction order, then partition; order
        // stays stable within each partition.
        let mut updates: Vec<(T, Shared<T>, Option<H::Token>)> = Vec::new();
        let mut creates: Vec<(T, Option<H::Token>)> = Vec::new();
        for entry in entries {
            let token = match &entry.original {
                Some(original) => {
                    let snapshot = original.read().clone();
                    self.repo
                        .hooks
                        .before_save(&entry.working, Some(&snapshot), params)
                }
                None => self.repo.hooks.before_save(&entry.working, None, params),
            };
            match entry.original {
                Some(original) => updates.push((entry.working, original, token)),
                None => creates.push((entry.working, token)),
            }
        }

        let update_count = updates.len();
        let create_count = creates.len();
        let mut results: Vec<(Shared<T>, Option<H::Token>)> =
            Vec::with_capacity(update_count + create_count);

        {
            let mut inner = self.repo.inner.write();
            for (working, original, token) in updates {
                inner.store.merge_onto(&original, &working)?;
                results.push((original, token));
            }
            for (working, token) in creates {
                let cell = shared(working);
                inner.store.register(&cell)?;
                results.push((cell, token));
            }
            if let Err(err) = inner.store.flush() {
                error!(
                    "event=batch_commit module=repo status=error updates={update_count} \
                     creates={create_count} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err.into());
            }
            if self.repo.cache_enabled {
                for (cell, _) in &results {
                    inner.cache.update(cell);
                }
            }
            for (cell, _) in &results {
                inner.store.detach(cell);
            }
        }

        info!(
            "event=batch_commit module=repo status=ok updates={update_count} \
             creates={create_count} duration_ms={}",
            started_at.elapsed().as_millis()
        );

        let mut committed = Vec::with_capacity(results.len());
        for (cell, token) in results {
            if let Some(token) = token {
                let snapshot = cell.read().clone();
                self.repo.hooks.after_save(&snapshot, token, params);
            }
            committed.push(cell);
        }

        Ok(committed)
    }
}
