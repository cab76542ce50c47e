use crate::error::Result;
use crate::storage::{to_sql_int, Storage};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

/// Local store for gamemaster reveal secrets. Never shared with other parties.
pub struct SecretStore<'a> {
    storage: &'a Storage,
}

impl<'a> SecretStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_secret(&self, game_id: u64, secret: &[u8]) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO secrets (game_id, secret, created_at) VALUES (?1, ?2, ?3)",
            params![to_sql_int(game_id)?, secret, Utc::now().timestamp()],
        )?;

        Ok(())
    }

    pub async fn load_secret(&self, game_id: u64) -> Result<Option<Vec<u8>>> {
        let conn = self.storage.get_connection().await;

        let secret = conn
            .query_row(
                "SELECT secret FROM secrets WHERE game_id = ?1",
                params![to_sql_int(game_id)?],
                |row| row.get(0),
            )
            .optional()?;

        Ok(secret)
    }
}
