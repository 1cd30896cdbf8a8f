//! Repository layer: cache-coherent atomic commits over a backing store.
//!
//! # Responsibility
//! - Own one entity type's store handle, cache, writer lock, and hooks.
//! - Hand out single and batch units of work and run their commit protocol.
//!
//! # Invariants
//! - Exactly one writer holds a repository's lock at a time; merge, flush,
//!   cache update, and detach for a commit all happen inside that critical
//!   section.
//! - Working copies are invisible to cache and store until committed.
//! - The writer lock is a scoped guard, released on every exit path.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::{Entity, Shared};
use crate::store::{Store, StoreError};
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod batch;
pub mod cache;
pub mod commit;
pub mod hooks;

pub use batch::AtomicBatch;
pub use cache::EntityCache;
pub use commit::AtomicCommit;
pub use hooks::{CommitHooks, NoHooks};

pub type RepoResult<T> = Result<T, RepoError>;

/// Commit-protocol failure taxonomy.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    /// The unit of work was already committed or released.
    Spent,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Spent => write!(f, "unit of work already committed or released"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Spent => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

struct RepoInner<T: Entity, S> {
    store: S,
    cache: EntityCache<T>,
}

/// Central authority for one entity type's persistence and caching.
///
/// Long-lived: one repository per entity type, created at startup. Commits
/// against one repository are fully serialized by its writer lock;
/// repositories for different entity types are independent.
pub struct Repository<T: Entity, S: Store<T>, H: CommitHooks<T>> {
    inner: RwLock<RepoInner<T, S>>,
    hooks: H,
    cache_enabled: bool,
}

impl<T: Entity, S: Store<T>, H: CommitHooks<T>> Repository<T, S, H> {
    /// Creates a repository with cache updates enabled.
    pub fn new(store: S, hooks: H) -> Self {
        Self::with_cache_policy(store, hooks, true)
    }

    /// Creates a repository whose commits skip the cache entirely.
    pub fn new_uncached(store: S, hooks: H) -> Self {
        Self::with_cache_policy(store, hooks, false)
    }

    fn with_cache_policy(store: S, hooks: H, cache_enabled: bool) -> Self {
        Self {
            inner: RwLock::new(RepoInner {
                store,
                cache: EntityCache::new(),
            }),
            hooks,
            cache_enabled,
        }
    }

    /// Opens a create-mode unit of work over a caller-supplied instance.
    ///
    /// The instance becomes the working copy; no original is tracked, and
    /// nothing is shared until commit.
    pub fn begin_add(&self, working: T) -> AtomicCommit<'_, T, S, H> {
        AtomicCommit::for_add(self, working)
    }

    /// Opens an update-mode unit of work against a committed entity.
    ///
    /// The working copy is a value clone of the original at open time;
    /// mutating it requires no lock and affects nothing shared.
    pub fn begin_update(&self, original: &Shared<T>) -> AtomicCommit<'_, T, S, H> {
        AtomicCommit::for_update(self, original)
    }

    /// Opens a create-mode batch: every entity is treated as an insert.
    pub fn begin_batch_add(&self, entities: Vec<T>) -> AtomicBatch<'_, T, S, H> {
        AtomicBatch::for_add(self, entities)
    }

    /// Opens an update-mode batch: every entity is cloned into a working
    /// copy associated with its original.
    pub fn begin_batch_update(&self, originals: &[Shared<T>]) -> AtomicBatch<'_, T, S, H> {
        AtomicBatch::for_update(self, originals)
    }

    /// Reader-side cache lookup, under the read lock.
    ///
    /// Readers never observe state mid-critical-section.
    pub fn cached(&self, key: T::Key) -> Option<Shared<T>> {
        self.inner.read().cache.get(key)
    }

    pub fn cache_len(&self) -> usize {
        self.inner.read().cache.len()
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Seeds the cache with already-loaded entities at startup.
    ///
    /// No-op when the cache is disabled.
    pub fn populate(&self, entities: impl IntoIterator<Item = Shared<T>>) {
        if !self.cache_enabled {
            return;
        }
        let mut inner = self.inner.write();
        for entity in entities {
            inner.cache.update(&entity);
        }
    }

    /// Runs `f` against the store under the read lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.read().store)
    }

    /// Runs `f` against the store under the writer lock.
    ///
    /// Maintenance access only; commits must go through units of work.
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.write().store)
    }
}
