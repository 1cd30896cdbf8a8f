//! Domain model for the media collection.
//!
//! # Responsibility
//! - Define canonical entity records shared by repository and store layers.
//! - Define the `Entity` contract every committable record implements.
//!
//! # Invariants
//! - Entity keys are store-assigned and never reused once set.
//! - `merge_from` copies tracked fields only; it never rewrites the key.
//!
//! # See also
//! - docs/architecture/data-model.md

use parking_lot::RwLock;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

pub mod episode;
pub mod series;

/// Shared handle to a committed entity.
///
/// Cache entries, update originals, and commit results are all `Shared`
/// cells, so an update merged onto an original is observed in place by every
/// holder of the same handle. Field writes happen only inside a repository's
/// writer critical section.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wraps an owned entity into a fresh [`Shared`] cell.
pub fn shared<T>(entity: T) -> Shared<T> {
    Arc::new(RwLock::new(entity))
}

/// Contract for records managed by a [`Repository`](crate::repo::Repository).
///
/// An entity starts life without a key; the store assigns one when the first
/// insert is flushed. From then on the key is the identity used by cache and
/// store lookups.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Primary-key type used by cache and store indexing.
    type Key: Copy + Eq + Hash + Display + Send + Sync;

    /// Returns the assigned key, or `None` before the first flush.
    fn key(&self) -> Option<Self::Key>;

    /// Records the store-assigned key.
    ///
    /// # Invariants
    /// - Called at most once per entity lifetime, by the store at flush time.
    fn set_key(&mut self, key: Self::Key);

    /// Copies every tracked field of `working` onto `self` by value.
    ///
    /// The key is deliberately excluded: merging a working copy onto its
    /// original must preserve the original's identity so external holders
    /// observe the update in place.
    fn merge_from(&mut self, working: &Self);
}
