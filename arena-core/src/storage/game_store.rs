use crate::error::Result;
use crate::storage::{from_sql_int, read_meta_u64, to_sql_int, write_meta, Storage};
use chrono::Utc;
use rusqlite::{params, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

const NEXT_GAME_ID: &str = "next_game_id";

/// Persists game snapshots as JSON plus the registry's id counter.
pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Save several games and the counter in one transaction.
    pub async fn save_all<T: Serialize>(
        &self,
        games: &[(u64, &T)],
        next_game_id: u64,
    ) -> Result<()> {
        self.storage
            .write_atomically(|tx| Self::write_all(tx, games, next_game_id))
            .await
    }

    /// Write games and the counter into a transaction owned by the caller.
    pub fn write_all<T: Serialize>(
        tx: &Transaction<'_>,
        games: &[(u64, &T)],
        next_game_id: u64,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        for (game_id, game) in games {
            tx.execute(
                "INSERT OR REPLACE INTO games (id, state, updated_at) VALUES (?1, ?2, ?3)",
                params![to_sql_int(*game_id)?, serde_json::to_string(game)?, now],
            )?;
        }
        write_meta(tx, NEXT_GAME_ID, &next_game_id.to_string())?;

        tracing::debug!("Wrote {} games, next id {}", games.len(), next_game_id);
        Ok(())
    }

    pub async fn list_games<T: DeserializeOwned>(&self) -> Result<Vec<(u64, T)>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT id, state FROM games ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut games = Vec::new();
        for row in rows {
            let (id, json) = row?;
            games.push((from_sql_int(id)?, serde_json::from_str(&json)?));
        }

        Ok(games)
    }

    pub async fn next_game_id(&self) -> Result<Option<u64>> {
        let conn = self.storage.get_connection().await;
        read_meta_u64(&conn, NEXT_GAME_ID)
    }
}
