//! Tag operations and transaction-tag associations

use std::collections::HashSet;

use rusqlite::{params, params_from_iter, Connection};

use super::{is_unique_violation, Database};
use crate::error::{Error, Result};
use crate::models::Tag;

/// Replace every tag link of a transaction
pub(super) fn replace_transaction_tags(
    conn: &Connection,
    transaction_id: i64,
    tag_ids: &[i64],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM transaction_tags WHERE transaction_id = ?",
        params![transaction_id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?, ?)",
    )?;
    for tag_id in tag_ids {
        stmt.execute(params![transaction_id, tag_id])?;
    }

    Ok(())
}

impl Database {
    /// Create a tag; names are unique per user
    pub fn create_tag(&self, user_id: i64, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Tag name is empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tags (user_id, name) VALUES (?, ?)",
            params![user_id, name],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Validation(format!("Tag '{}' already exists", name))
            } else {
                e.into()
            }
        })?;

        Ok(Tag {
            id: conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
        })
    }

    /// List a user's tags by name
    pub fn list_tags(&self, user_id: i64) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, user_id, name FROM tags WHERE user_id = ? ORDER BY name")?;

        let tags = stmt
            .query_map(params![user_id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Tag IDs linked to an owned transaction
    pub fn get_transaction_tag_ids(&self, user_id: i64, transaction_id: i64) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT tt.tag_id
            FROM transaction_tags tt
            JOIN transactions t ON t.id = tt.transaction_id
            WHERE tt.transaction_id = ? AND t.user_id = ?
            ORDER BY tt.tag_id
            "#,
        )?;

        let ids = stmt
            .query_map(params![transaction_id, user_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// The subset of `tag_ids` that exist and belong to the user
    pub fn get_owned_tag_ids(&self, user_id: i64, tag_ids: &[i64]) -> Result<HashSet<i64>> {
        if tag_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let conn = self.conn()?;
        let placeholders = vec!["?"; tag_ids.len()].join(", ");
        let sql = format!(
            "SELECT id FROM tags WHERE user_id = ? AND id IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let values = std::iter::once(user_id).chain(tag_ids.iter().copied());
        let ids = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<std::result::Result<HashSet<i64>, _>>()?;

        Ok(ids)
    }
}
