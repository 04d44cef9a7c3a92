//! User operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

impl Database {
    /// Get a user by name, creating it on first use
    pub fn get_or_create_user(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("User name is empty".into()));
        }

        self.conn()?.execute(
            "INSERT OR IGNORE INTO users (name) VALUES (?)",
            params![name],
        )?;

        self.find_user(name)?
            .ok_or_else(|| Error::NotFound(format!("User {}", name)))
    }

    /// Look up a user by name without creating it
    pub fn find_user(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE name = ?",
                params![name],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )
            .optional()?;

        Ok(user)
    }
}
