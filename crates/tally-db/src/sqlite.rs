//! SQLite backend.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::{migrations, DbError, Result, Store};

/// [`Store`] over a single SQLite database.
pub struct SqliteStore {
    conn: Connection,
    in_batch: bool,
}

impl SqliteStore {
    /// Open or create the ledger database at `path`.
    ///
    /// Configures WAL mode and runs any pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self {
            conn,
            in_batch: false,
        })
    }

    /// Underlying connection, for inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;",
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn get_raw(&self, kind: &str, id: &str) -> Result<Option<String>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM entities WHERE kind = ?1 AND id = ?2",
                [kind, id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn set_raw(&mut self, kind: &str, id: &str, body: String) -> Result<()> {
        self.conn.execute(
            "INSERT INTO entities (kind, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (kind, id) DO UPDATE SET
                body = excluded.body,
                updated_at = strftime('%s', 'now')",
            rusqlite::params![kind, id, body],
        )?;
        Ok(())
    }

    fn delete_raw(&mut self, kind: &str, id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
            [kind, id],
        )?;
        Ok(())
    }

    fn list_ids(&self, kind: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM entities WHERE kind = ?1 ORDER BY id")?;
        let rows = stmt.query_map([kind], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn begin_batch(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_batch = true;
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        if !self.in_batch {
            return Err(DbError::NoBatch);
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_batch = false;
        Ok(())
    }

    fn rollback_batch(&mut self) -> Result<()> {
        if !self.in_batch {
            return Err(DbError::NoBatch);
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.in_batch = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StoreExt, SCHEMA_VERSION};
    use tally_types::epoch::LeaderboardConfig;

    #[test]
    fn test_open_memory() {
        let store = SqliteStore::open_memory().expect("open in-memory db");
        let version: u32 = store
            .connection()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_upsert_replaces_body() {
        let mut store = SqliteStore::open_memory().expect("open");
        store.set_raw("k", "a", "1".into()).expect("set");
        store.set_raw("k", "a", "2".into()).expect("set again");
        assert_eq!(store.get_raw("k", "a").expect("get"), Some("2".into()));
        assert_eq!(store.list_ids("k").expect("list").len(), 1);
    }

    #[test]
    fn test_typed_config_roundtrip() {
        let mut store = SqliteStore::open_memory().expect("open");
        let mut config = LeaderboardConfig::default();
        config.daily_lp_bonus = u128::MAX;
        store.set(&config).expect("set");
        let loaded: LeaderboardConfig = store.get("global").expect("get").expect("present");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut store = SqliteStore::open_memory().expect("open");
        store.begin_batch().expect("begin");
        store.set_raw("k", "a", "1".into()).expect("set");
        store.rollback_batch().expect("rollback");
        assert_eq!(store.get_raw("k", "a").expect("get"), None);

        store.begin_batch().expect("begin");
        store.set_raw("k", "b", "1".into()).expect("set");
        store.commit_batch().expect("commit");
        assert_eq!(store.get_raw("k", "b").expect("get"), Some("1".into()));
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let mut store = SqliteStore::open_memory().expect("open");
        store.delete_raw("k", "nope").expect("delete");
        assert!(store.list_ids("k").expect("list").is_empty());
    }
}
