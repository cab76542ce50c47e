use crate::error::Result;
use crate::storage::{from_sql_int, to_sql_int, Storage};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent<T> {
    pub seq: u64,
    pub game_id: u64,
    pub kind: String,
    pub recorded_at: DateTime<Utc>,
    pub event: T,
}

/// Append-only log of contest events.
pub struct EventStore<'a> {
    storage: &'a Storage,
}

impl<'a> EventStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn append<T: Serialize>(
        &self,
        game_id: u64,
        kind: &str,
        event: &T,
        recorded_at: DateTime<Utc>,
    ) -> Result<u64> {
        let conn = self.storage.get_connection().await;
        Self::write_event(&conn, game_id, kind, event, recorded_at)
    }

    /// Append one event on `conn`, which may be a caller's open transaction.
    pub fn write_event<T: Serialize>(
        conn: &Connection,
        game_id: u64,
        kind: &str,
        event: &T,
        recorded_at: DateTime<Utc>,
    ) -> Result<u64> {
        conn.execute(
            "INSERT INTO events (game_id, kind, payload, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                to_sql_int(game_id)?,
                kind,
                serde_json::to_string(event)?,
                recorded_at.timestamp(),
            ],
        )?;

        from_sql_int(conn.last_insert_rowid())
    }

    /// Events in append order, optionally restricted to one game.
    pub async fn list<T: DeserializeOwned>(
        &self,
        game_id: Option<u64>,
    ) -> Result<Vec<StoredEvent<T>>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT seq, game_id, kind, payload, recorded_at FROM events
             WHERE ?1 IS NULL OR game_id = ?1 ORDER BY seq ASC",
        )?;

        let filter = game_id.map(to_sql_int).transpose()?;
        let rows = stmt.query_map(params![filter], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (seq, game_id, kind, payload, recorded_at) = row?;
            events.push(StoredEvent {
                seq: from_sql_int(seq)?,
                game_id: from_sql_int(game_id)?,
                kind,
                recorded_at: DateTime::from_timestamp(recorded_at, 0).unwrap_or_else(Utc::now),
                event: serde_json::from_str(&payload)?,
            });
        }

        Ok(events)
    }
}
