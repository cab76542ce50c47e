pub mod beacon_store;
pub mod event_store;
pub mod game_store;
pub mod ledger_store;
pub mod secret_store;

pub use beacon_store::BeaconStore;
pub use event_store::{EventStore, StoredEvent};
pub use game_store::GameStore;
pub use ledger_store::LedgerStore;
pub use secret_store::SecretStore;

use crate::error::{ArenaError, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArenaError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    /// Storage backed by a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        // Games table, one JSON snapshot per game
        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Append-only event log
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                recorded_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                account TEXT PRIMARY KEY,
                balance INTEGER NOT NULL,
                refusing INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS beacon_samples (
                checkpoint INTEGER PRIMARY KEY,
                sample TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS secrets (
                game_id INTEGER PRIMARY KEY,
                secret BLOB NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Run `write` in a single transaction. Nothing is kept unless it returns `Ok`.
    pub async fn write_atomically<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&Transaction<'_>) -> Result<()>,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        write(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub(crate) fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn read_meta_u64(conn: &Connection, key: &str) -> Result<Option<u64>> {
    read_meta(conn, key)?
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|e| ArenaError::internal(format!("Corrupt meta value '{}': {}", key, e)))
        })
        .transpose()
}

/// SQLite integers are signed; every id and amount we store fits in i64.
pub(crate) fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| ArenaError::internal(format!("Value {} does not fit in SQLite", value)))
}

pub(crate) fn from_sql_int(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| ArenaError::internal(format!("Negative value {} in storage", value)))
}
