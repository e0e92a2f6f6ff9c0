//! SQLite-backed favourites persistence.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};

use super::{PersistenceError, PersistenceProvider};
use crate::media::MediaType;

/// SQLite-backed favourites table.
pub struct SqliteFavourites {
    conn: Mutex<Connection>,
}

impl SqliteFavourites {
    /// Open the database file, creating it and the table if needed.
    pub fn new(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path).map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn =
            Connection::open_in_memory().map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS favourites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                media_id INTEGER NOT NULL,
                media_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(user_id, media_id, media_type)
            );

            CREATE INDEX IF NOT EXISTS idx_favourites_user ON favourites(user_id, media_type);
            "#,
        )
        .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Backend("connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl PersistenceProvider for SqliteFavourites {
    async fn list_favourites(
        &self,
        user_id: &str,
        media_type: MediaType,
    ) -> Result<Vec<u32>, PersistenceError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT media_id FROM favourites
                 WHERE user_id = ? AND media_type = ?
                 ORDER BY media_id",
            )
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id, media_type.as_str()], |row| row.get(0))
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(|e| PersistenceError::Backend(e.to_string()))?);
        }
        Ok(ids)
    }

    async fn insert_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO favourites (user_id, media_id, media_type, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                user_id,
                media_id,
                media_type.as_str(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM favourites WHERE user_id = ? AND media_id = ? AND media_type = ?",
            params![user_id, media_id, media_type.as_str()],
        )
        .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
