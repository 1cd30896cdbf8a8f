//! Persistent store contracts and backends.
//!
//! # Responsibility
//! - Define the store collaborator contract consumed by the commit protocol.
//! - Isolate SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `register`/`merge_onto` only queue work; nothing is durable before
//!   `flush` returns `Ok`.
//! - `flush` applies all pending changes in a single transaction.
//! - Pending changes survive a failed flush and are applied by the next
//!   successful one; there is no rollback of queued work.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::{Entity, Shared};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqlEntity, SqliteStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure taxonomy.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// An update was queued for an entity that never received a key.
    MissingKey { table: &'static str },
    /// A flushed update matched no persisted row.
    RowNotFound { table: &'static str, key: i64 },
    /// A persisted row failed model-level decoding.
    InvalidRow { table: &'static str, message: String },
    /// Opaque backend fault (used by non-SQLite backends).
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingKey { table } => {
                write!(f, "cannot update `{table}` row without an assigned key")
            }
            Self::RowNotFound { table, key } => {
                write!(f, "no `{table}` row found for key {key}")
            }
            Self::InvalidRow { table, message } => {
                write!(f, "invalid persisted `{table}` row: {message}")
            }
            Self::Backend(message) => write!(f, "store backend failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingKey { .. }
            | Self::RowNotFound { .. }
            | Self::InvalidRow { .. }
            | Self::Backend(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Collaborator contract between the commit protocol and a backing store.
///
/// All four operations are invoked while the owning repository holds its
/// writer lock, so implementations need no internal synchronization.
pub trait Store<T: Entity> {
    /// Queues an insert for a not-yet-persisted entity.
    ///
    /// The store assigns the entity's key when the insert is flushed.
    fn register(&mut self, entity: &Shared<T>) -> StoreResult<()>;

    /// Copies `working`'s tracked fields onto `original` in place and queues
    /// an update for the merged row.
    ///
    /// # Invariants
    /// - `original`'s key is preserved.
    fn merge_onto(&mut self, original: &Shared<T>, working: &T) -> StoreResult<()>;

    /// Persists every pending change in one transaction.
    fn flush(&mut self) -> StoreResult<()>;

    /// Drops the entity from live tracking; the caller keeps a plain,
    /// untracked snapshot.
    fn detach(&mut self, entity: &Shared<T>);
}
