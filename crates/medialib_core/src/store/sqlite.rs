//! SQLite-backed store implementation.
//!
//! # Responsibility
//! - Queue registered/merged entities and flush them in one transaction.
//! - Keep per-entity SQL statements inside the persistence boundary.
//!
//! # Invariants
//! - Keys are assigned from `last_insert_rowid` only after the flush
//!   transaction commits.
//! - The tracked identity map never outlives its entity handles (weak refs).
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::episode::Episode;
use crate::model::series::Series;
use crate::model::{shared, Entity, Shared};
use crate::store::{Store, StoreError, StoreResult};
use parking_lot::RwLock;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Per-entity SQL mapping consumed by [`SqliteStore`].
///
/// `field_params` must yield values in the positional order shared by
/// `INSERT_SQL` and `UPDATE_SQL`; the store appends the key as the final
/// update parameter.
pub trait SqlEntity: Entity<Key = i64> {
    const TABLE: &'static str;
    const SELECT_SQL: &'static str;
    const INSERT_SQL: &'static str;
    const UPDATE_SQL: &'static str;

    fn field_params(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> StoreResult<Self>;
}

enum Pending<T> {
    Insert(Shared<T>),
    Update(Shared<T>),
}

/// SQLite store with a pending-operation queue and weak identity map.
pub struct SqliteStore<'conn, T: SqlEntity> {
    conn: &'conn Connection,
    pending: Vec<Pending<T>>,
    tracked: HashMap<i64, Weak<RwLock<T>>>,
}

impl<'conn, T: SqlEntity> SqliteStore<'conn, T> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            pending: Vec::new(),
            tracked: HashMap::new(),
        }
    }

    /// Loads every persisted row into shared handles.
    ///
    /// Rows already live in the tracked map are returned as their existing
    /// handles, so repeated loads never fork an entity's identity.
    pub fn load_all(&mut self) -> StoreResult<Vec<Shared<T>>> {
        let mut stmt = self.conn.prepare(T::SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut loaded = Vec::new();

        while let Some(row) = rows.next()? {
            let entity = T::from_row(row)?;
            let cell = match entity.key().and_then(|key| self.live_handle(key)) {
                Some(existing) => existing,
                None => {
                    let cell = shared(entity);
                    if let Some(key) = cell.read().key() {
                        self.tracked.insert(key, Arc::downgrade(&cell));
                    }
                    cell
                }
            };
            loaded.push(cell);
        }

        Ok(loaded)
    }

    /// Returns whether a key currently has a live tracked handle.
    pub fn is_tracked(&self, key: i64) -> bool {
        self.tracked
            .get(&key)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    fn live_handle(&self, key: i64) -> Option<Shared<T>> {
        self.tracked.get(&key).and_then(Weak::upgrade)
    }
}

impl<T: SqlEntity> Store<T> for SqliteStore<'_, T> {
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
            self.tracked.insert(key, Arc::downgrade(original));
        }
        self.pending.push(Pending::Update(original.clone()));
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut assigned: Vec<(Shared<T>, i64)> = Vec::new();

        for op in &self.pending {
            match op {
                Pending::Insert(cell) => {
                    let row = cell.read();
                    tx.execute(T::INSERT_SQL, params_from_iter(row.field_params()))?;
                    drop(row);
                    assigned.push((cell.clone(), tx.last_insert_rowid()));
                }
                Pending::Update(cell) => {
                    let row = cell.read();
                    let key = row.key().ok_or(StoreError::MissingKey { table: T::TABLE })?;
                    let mut values = row.field_params();
                    values.push(Value::Integer(key));
                    let changed = tx.execute(T::UPDATE_SQL, params_from_iter(values))?;
                    if changed == 0 {
                        return Err(StoreError::RowNotFound {
                            table: T::TABLE,
                            key,
                        });
                    }
                }
            }
        }

        tx.commit()?;
        self.pending.clear();

        // Keys become visible only once the transaction is durable.
        for (cell, key) in assigned {
            cell.write().set_key(key);
            self.tracked.insert(key, Arc::downgrade(&cell));
        }

        Ok(())
    }

    fn detach(&mut self, entity: &Shared<T>) {
        if let Some(key) = entity.read().key() {
            self.tracked.remove(&key);
        }
    }
}

fn parse_guid(table: &'static str, text: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(text).map_err(|_| StoreError::InvalidRow {
        table,
        message: format!("invalid guid value `{text}`"),
    })
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn int_to_bool(table: &'static str, column: &str, value: i64) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidRow {
            table,
            message: format!("invalid boolean value `{other}` in {column}"),
        }),
    }
}

impl SqlEntity for Series {
    const TABLE: &'static str = "series";

    const SELECT_SQL: &'static str = "SELECT
        id,
        guid,
        title,
        overview,
        air_year,
        episode_count,
        rating
    FROM series";

    const INSERT_SQL: &'static str = "INSERT INTO series (
        guid,
        title,
        overview,
        air_year,
        episode_count,
        rating
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);";

    const UPDATE_SQL: &'static str = "UPDATE series
     SET
        guid = ?1,
        title = ?2,
        overview = ?3,
        air_year = ?4,
        episode_count = ?5,
        rating = ?6,
        updated_at = (strftime('%s', 'now') * 1000)
     WHERE id = ?7;";

    fn field_params(&self) -> Vec<Value> {
        vec![
            Value::Text(self.guid.to_string()),
            Value::Text(self.title.clone()),
            self.overview.clone().map_or(Value::Null, Value::Text),
            self.air_year
                .map_or(Value::Null, |year| Value::Integer(i64::from(year))),
            Value::Integer(i64::from(self.episode_count)),
            self.rating
                .map_or(Value::Null, |rating| Value::Integer(i64::from(rating))),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let guid_text: String = row.get("guid")?;
        let episode_count: i64 = row.get("episode_count")?;
        let episode_count = u32::try_from(episode_count).map_err(|_| StoreError::InvalidRow {
            table: Self::TABLE,
            message: format!("invalid episode_count value `{episode_count}`"),
        })?;
        let rating = match row.get::<_, Option<i64>>("rating")? {
            Some(value) => Some(u8::try_from(value).map_err(|_| StoreError::InvalidRow {
                table: Self::TABLE,
                message: format!("invalid rating value `{value}`"),
            })?),
            None => None,
        };

        Ok(Self {
            id: Some(row.get("id")?),
            guid: parse_guid(Self::TABLE, &guid_text)?,
            title: row.get("title")?,
            overview: row.get("overview")?,
            air_year: row.get("air_year")?,
            episode_count,
            rating,
        })
    }
}

impl SqlEntity for Episode {
    const TABLE: &'static str = "episodes";

    const SELECT_SQL: &'static str = "SELECT
        id,
        guid,
        series_id,
        number,
        title,
        watched
    FROM episodes";

    const INSERT_SQL: &'static str = "INSERT INTO episodes (
        guid,
        series_id,
        number,
        title,
        watched
    ) VALUES (?1, ?2, ?3, ?4, ?5);";

    const UPDATE_SQL: &'static str = "UPDATE episodes
     SET
        guid = ?1,
        series_id = ?2,
        number = ?3,
        title = ?4,
        watched = ?5
     WHERE id = ?6;";

    fn field_params(&self) -> Vec<Value> {
        vec![
            Value::Text(self.guid.to_string()),
            self.series_id.map_or(Value::Null, Value::Integer),
            Value::Integer(i64::from(self.number)),
            Value::Text(self.title.clone()),
            Value::Integer(bool_to_int(self.watched)),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let guid_text: String = row.get("guid")?;
        let number: i64 = row.get("number")?;
        let number = u32::try_from(number).map_err(|_| StoreError::InvalidRow {
            table: Self::TABLE,
            message: format!("invalid number value `{number}`"),
        })?;
        let watched = int_to_bool(Self::TABLE, "episodes.watched", row.get("watched")?)?;

        Ok(Self {
            id: Some(row.get("id")?),
            guid: parse_guid(Self::TABLE, &guid_text)?,
            series_id: row.get("series_id")?,
            number,
            title: row.get("title")?,
            watched,
        })
    }
}
