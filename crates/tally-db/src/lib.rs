//! # tally-db
//!
//! Keyed entity storage for the points ledger.
//!
//! Components never see a concrete backend: they take `&mut dyn Store` and
//! use the typed helpers of [`StoreExt`]. Bodies are JSON; the key is the
//! entity's `KIND` plus its string id.
//!
//! ## Modules
//!
//! - [`memory`] — `BTreeMap` backend for tests and dry runs
//! - [`sqlite`] — SQLite backend (WAL, `PRAGMA user_version` migrations)
//! - [`migrations`] — forward-only schema migrations
//! - [`schema`] — SQL schema definitions

pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use tally_types::Entity;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("serialization error for {kind}/{id}: {source}")]
    Serialization {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no batch in progress")]
    NoBatch,
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Raw keyed storage. Object safe.
pub trait Store {
    /// Body of `kind/id`, if present.
    fn get_raw(&self, kind: &str, id: &str) -> Result<Option<String>>;

    /// Upsert the body of `kind/id`.
    fn set_raw(&mut self, kind: &str, id: &str, body: String) -> Result<()>;

    /// Unconditional delete. Deleting a missing key is not an error.
    fn delete_raw(&mut self, kind: &str, id: &str) -> Result<()>;

    /// All ids of `kind`, ascending.
    fn list_ids(&self, kind: &str) -> Result<Vec<String>>;

    /// Start an atomic batch covering one event.
    fn begin_batch(&mut self) -> Result<()>;

    /// Make the current batch durable.
    fn commit_batch(&mut self) -> Result<()>;

    /// Discard every write since [`Store::begin_batch`].
    fn rollback_batch(&mut self) -> Result<()>;
}

/// Typed access over any [`Store`].
pub trait StoreExt: Store {
    /// Load an entity by id.
    ///
    /// # Errors
    ///
    /// - [`DbError::Serialization`] if the stored body does not decode as `E`
    fn get<E: Entity>(&self, id: &str) -> Result<Option<E>> {
        match self.get_raw(E::KIND, id)? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|source| DbError::Serialization {
                    kind: E::KIND,
                    id: id.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Upsert an entity under its own id.
    fn set<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let id = entity.id();
        let body = serde_json::to_string(entity).map_err(|source| DbError::Serialization {
            kind: E::KIND,
            id: id.clone(),
            source,
        })?;
        self.set_raw(E::KIND, &id, body)
    }

    /// Delete an entity by id without checking it exists.
    fn delete_unsafe<E: Entity>(&mut self, id: &str) -> Result<()> {
        self.delete_raw(E::KIND, id)
    }

    /// Load every entity of a kind, in id order.
    fn list<E: Entity>(&self) -> Result<Vec<E>> {
        let mut out = Vec::new();
        for id in self.list_ids(E::KIND)? {
            if let Some(entity) = self.get::<E>(&id)? {
                out.push(entity);
            }
        }
        Ok(out)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::epoch::Epoch;

    #[test]
    fn test_typed_roundtrip_through_dyn_store() {
        let mut backend = MemoryStore::new();
        let store: &mut dyn Store = &mut backend;

        let mut epoch = Epoch::new(3);
        epoch.start_time = 100;
        store.set(&epoch).expect("set");

        let loaded: Epoch = store.get("3").expect("get").expect("present");
        assert_eq!(loaded, epoch);

        store.delete_unsafe::<Epoch>("3").expect("delete");
        assert!(store.get::<Epoch>("3").expect("get").is_none());
    }

    #[test]
    fn test_corrupt_body_reports_kind() {
        let mut store = MemoryStore::new();
        store
            .set_raw("epoch", "1", "not json".to_string())
            .expect("set raw");
        let err = store.get::<Epoch>("1").expect_err("decode should fail");
        assert!(matches!(err, DbError::Serialization { kind: "epoch", .. }));
    }

    #[test]
    fn test_list_in_id_order() {
        let mut store = MemoryStore::new();
        for n in [2u64, 1, 3] {
            store.set(&Epoch::new(n)).expect("set");
        }
        let epochs: Vec<Epoch> = store.list().expect("list");
        let numbers: Vec<u64> = epochs.iter().map(|e| e.epoch_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
