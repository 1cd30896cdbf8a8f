//! Episode domain model.

use crate::model::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical record for one episode of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Store-assigned primary key; `None` until first flushed.
    pub id: Option<i64>,
    /// Stable global ID used for sync mapping.
    pub guid: Uuid,
    /// Owning series key, once that series has been flushed.
    pub series_id: Option<i64>,
    /// Episode number within the series ordering.
    pub number: u32,
    /// Display title.
    pub title: String,
    /// Watched flag maintained by playback tracking.
    pub watched: bool,
}

impl Episode {
    /// Creates a new unsaved episode with a generated stable guid.
    pub fn new(number: u32, title: impl Into<String>) -> Self {
        Self {
            id: None,
            guid: Uuid::new_v4(),
            series_id: None,
            number,
            title: title.into(),
            watched: false,
        }
    }
}

impl Entity for Episode {
    type Key = i64;

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = Some(key);
    }

    fn merge_from(&mut self, working: &Self) {
        self.guid = working.guid;
        self.series_id = working.series_id;
        self.number = working.number;
        self.title = working.title.clone();
        self.watched = working.watched;
    }
}
