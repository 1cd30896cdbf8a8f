//! Single-entity unit of work.
//!
//! # Responsibility
//! - Hold one pending create/update as an exclusively-owned working copy.
//! - Run the single-commit protocol against the owning repository.
//!
//! # Invariants
//! - Mutating the working copy takes no lock and touches nothing shared.
//! - A unit of work is one-shot: it is spent on entering `commit`, success
//!   or failure, and a second commit fails fast.

use crate::model::{shared, Entity, Shared};
use crate::repo::{CommitHooks, RepoError, RepoResult, Repository};
use crate::store::Store;
use log::{debug, error};
use std::time::Instant;

/// One pending create or update against a repository.
///
/// Obtained from [`Repository::begin_add`] or [`Repository::begin_update`].
/// Dropping it without committing has zero observable effect.
pub struct AtomicCommit<'r, T: Entity, S: Store<T>, H: CommitHooks<T>> {
    repo: &'r Repository<T, S, H>,
    working: Option<T>,
    original: Option<Shared<T>>,
}

impl<'r, T: Entity, S: Store<T>, H: CommitHooks<T>> AtomicCommit<'r, T, S, H> {
    pub(crate) fn for_add(repo: &'r Repository<T, S, H>, working: T) -> Self {
        Self {
            repo,
            working: Some(working),
            original: None,
        }
    }

    pub(crate) fn for_update(repo: &'r Repository<T, S, H>, original: &Shared<T>) -> Self {
        Self {
            repo,
            working: Some(original.read().clone()),
            original: Some(original.clone()),
        }
    }

    /// Read access to the working copy.
    pub fn entity(&self) -> RepoResult<&T> {
        self.working.as_ref().ok_or(RepoError::Spent)
    }

    /// Exclusive mutable access to the working copy; no lock is held.
    pub fn entity_mut(&mut self) -> RepoResult<&mut T> {
        self.working.as_mut().ok_or(RepoError::Spent)
    }

    /// The original this update targets, if opened in update mode.
    pub fn original(&self) -> Option<&Shared<T>> {
        self.original.as_ref()
    }

    pub fn is_update(&self) -> bool {
        self.original.is_some()
    }

    /// Discards the pending work without any store or cache mutation.
    pub fn release(&mut self) {
        self.working = None;
        self.original = None;
    }

    /// Commits the pending create/update.
    ///
    /// Protocol: pre-commit hook (no lock) → writer lock → merge or register
    /// → flush → cache update → detach → unlock → post-commit hook. The lock
    /// has no timeout; callers must not nest commits on the same repository.
    ///
    /// # Errors
    /// - [`RepoError::Spent`] when already committed or released; no store
    ///   or cache mutation occurs.
    /// - [`RepoError::Store`] when the flush fails; the cache is untouched
    ///   and the lock is released, but the unit stays spent.
    pub fn commit(&mut self, params: &H::Params) -> RepoResult<Shared<T>> {
        let working = self.working.take().ok_or(RepoError::Spent)?;
        let original = self.original.take();
        let started_at = Instant::now();
        let mode = if original.is_some() { "update" } else { "add" };

        // Hooks observe snapshots; no entity lock is held while they run.
        let token = match &original {
            Some(orig) => {
                let snapshot = orig.read().clone();
                self.repo
                    .hooks
                    .before_save(&working, Some(&snapshot), params)
            }
            None => self.repo.hooks.before_save(&working, None, params),
        };

        let result = {
            let mut inner = self.repo.inner.write();
            let result = match &original {
                Some(orig) => {
                    inner.store.merge_onto(orig, &working)?;
                    orig.clone()
                }
                None => {
                    let cell = shared(working);
                    inner.store.register(&cell)?;
                    cell
                }
            };
            if let Err(err) = inner.store.flush() {
                error!(
                    "event=commit module=repo status=error mode={mode} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err.into());
            }
            if self.repo.cache_enabled {
                inner.cache.update(&result);
            }
            inner.store.detach(&result);
            result
        };

        debug!(
            "event=commit module=repo status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        );

        if let Some(token) = token {
            let snapshot = result.read().clone();
            self.repo.hooks.after_save(&snapshot, token, params);
        }

        Ok(result)
    }
}
