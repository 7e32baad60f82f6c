//! # SQLite Key-Value Store
//!
//! Durable [`KeyValueStore`] backed by a single SQLite table. History snapshots
//! are written with `INSERT OR REPLACE`, so each save is one atomic statement:
//! a crash mid-write leaves the previous snapshot intact.

use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::KeyValueStore;
use crate::{Result, TrackerError};

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::storage(err.to_string())
    }
}

/// Key-value store persisted in SQLite.
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        log::info!("[SqliteStore] Opened {}", db_path);
        Ok(Self { db })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// Number of stored keys.
    pub fn key_count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
             VALUES (?, ?, strftime('%s', 'now'))",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("fitnessRoutes").unwrap(), None);

        store.set("fitnessRoutes", "[]").unwrap();
        store.set("fitnessRoutes", "[1]").unwrap();
        assert_eq!(store.get("fitnessRoutes").unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.key_count().unwrap(), 1);

        store.remove("fitnessRoutes").unwrap();
        store.remove("fitnessRoutes").unwrap();
        assert_eq!(store.get("fitnessRoutes").unwrap(), None);
        assert_eq!(store.key_count().unwrap(), 0);
    }
}
