//! Core persistence and caching layer for the media library server.
//! This crate is the single source of truth for the atomic commit protocol.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::episode::Episode;
pub use model::series::Series;
pub use model::{shared, Entity, Shared};
pub use repo::{
    AtomicBatch, AtomicCommit, CommitHooks, EntityCache, NoHooks, RepoError, RepoResult,
    Repository,
};
pub use store::{MemoryStore, SqlEntity, SqliteStore, Store, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
