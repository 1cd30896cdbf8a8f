//! Commit extensibility hooks.
//!
//! # Responsibility
//! - Define the injected strategy pair invoked around every commit.
//!
//! # Invariants
//! - `before_save` runs strictly before the writer critical section,
//!   `after_save` strictly after it, in matched pairs per returned token.
//! - Hooks observe snapshots; no entity or repository lock is held while a
//!   hook runs.

use crate::model::Entity;

/// Strategy pair invoked once per entity around a commit.
///
/// `before_save` may return a correlation token; `after_save` is invoked
/// exactly when a token was returned, with that token, after the store flush
/// completes. Hooks cannot veto a commit: callers must validate before
/// opening a unit of work.
///
/// Hooks must not open or commit units of work against the same repository;
/// the writer lock has no timeout and such a commit would deadlock against
/// its own caller.
pub trait CommitHooks<T: Entity> {
    /// Caller-supplied context forwarded verbatim to both hooks.
    type Params;
    /// Opaque correlation value between the two hook calls.
    type Token;

    /// Observes a pending commit before the critical section.
    ///
    /// `original` is a snapshot of the last committed state for updates, or
    /// `None` for creates. Runs without any lock held; it must not assume
    /// exclusivity.
    fn before_save(
        &self,
        working: &T,
        original: Option<&T>,
        params: &Self::Params,
    ) -> Option<Self::Token>;

    /// Observes the committed result, strictly after the store flush for
    /// that commit, outside the writer lock.
    fn after_save(&self, result: &T, token: Self::Token, params: &Self::Params);
}

/// Default no-op hook strategy.
pub struct NoHooks;

impl<T: Entity> CommitHooks<T> for NoHooks {
    type Params = ();
    type Token = ();

    fn before_save(&self, _working: &T, _original: Option<&T>, _params: &()) -> Option<()> {
        None
    }

    fn after_save(&self, _result: &T, _token: (), _params: &()) {}
}
