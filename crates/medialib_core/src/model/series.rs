//! Series domain model.
//!
//! # Responsibility
//! - Define the canonical record for a collected show/season grouping.
//!
//! # Invariants
//! - `guid` is stable from creation and never reused for another series.
//! - `id` is absent until the store flushes the first insert.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical record for one series in the collection.
///
/// Metadata fields are optional because provider lookups fill them in
/// asynchronously, often across several commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Store-assigned primary key; `None` until first flushed.
    pub id: Option<i64>,
    /// Stable global ID used for sync mapping and external references.
    pub guid: Uuid,
    /// Display title, provider-normalized.
    pub title: String,
    /// Long-form synopsis from the metadata provider.
    pub overview: Option<String>,
    /// First air year, when known.
    pub air_year: Option<i32>,
    /// Number of known episodes, maintained by import passes.
    pub episode_count: u32,
    /// Aggregate community rating scaled to 0..=100.
    pub rating: Option<u8>,
}

impl Series {
    /// Creates a new unsaved series with a generated stable guid.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            guid: Uuid::new_v4(),
            title: title.into(),
            overview: None,
            air_year: None,
            episode_count: 0,
            rating: None,
        }
    }
}

impl Entity for Series {
    type Key = i64;

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = Some(key);
    }

    fn merge_from(&mut self, working: &Self) {
        self.guid = working.guid;
        self.title = working.title.clone();
        self.overview = working.overview.clone();
        self.air_year = working.air_year;
        self.episode_count = working.episode_count;
        self.rating = working.rating;
    }
}
