use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use hearth_shared::types::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::row::timestamp_at;

impl Database {
    /// Insert the user, or refresh the username if the id is already known.
    pub fn ensure_user(&self, id: &UserId, username: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET username = excluded.username",
            params![id.as_str(), username, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn user_exists(&self, id: &UserId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok(User {
                        id: UserId(row.get(0)?),
                        username: row.get(1)?,
                        created_at: timestamp_at(row, 2)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}
