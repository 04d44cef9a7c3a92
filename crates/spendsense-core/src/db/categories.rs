//! Category and merchant operations

use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{is_unique_violation, Database};
use crate::error::{Error, Result};
use crate::models::{Category, Merchant};

/// Starter categories: (name, is_income, icon)
pub const DEFAULT_CATEGORIES: &[(&str, bool, &str)] = &[
    ("Food", false, "utensils"),
    ("Groceries", false, "shopping-basket"),
    ("Travel", false, "bus"),
    ("Shopping", false, "shopping-bag"),
    ("Services", false, "wrench"),
    ("Rent", false, "home"),
    ("Bills", false, "file-text"),
    ("Health & Wellness", false, "heart"),
    ("Personal Care", false, "scissors"),
    ("Entertainment", false, "film"),
    ("Education", false, "book"),
    ("Transfers", false, "repeat"),
    ("Miscellaneous", false, "tag"),
    ("Salary", true, "briefcase"),
];

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        is_income: row.get(3)?,
        icon: row.get(4)?,
    })
}

impl Database {
    /// Create a category; names are unique per user, ignoring case
    pub fn create_category(
        &self,
        user_id: i64,
        name: &str,
        is_income: bool,
        icon: Option<&str>,
    ) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Category name is empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (user_id, name, is_income, icon) VALUES (?, ?, ?, ?)",
            params![user_id, name, is_income, icon],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Validation(format!("Category '{}' already exists", name))
            } else {
                e.into()
            }
        })?;

        Ok(Category {
            id: conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            is_income,
            icon: icon.map(String::from),
        })
    }

    /// Categories ordered by ID
    pub fn get_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, is_income, icon FROM categories WHERE user_id = ? ORDER BY id",
        )?;

        let categories = stmt
            .query_map(params![user_id], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Case-insensitive lookup by name
    pub fn find_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, user_id, name, is_income, icon FROM categories WHERE user_id = ? AND name = ?",
                params![user_id, name.trim()],
                row_to_category,
            )
            .optional()?;

        Ok(category)
    }

    /// Create any missing starter categories, returning how many were added
    pub fn seed_default_categories(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let mut added = 0;

        for (name, is_income, icon) in DEFAULT_CATEGORIES {
            added += conn.execute(
                "INSERT OR IGNORE INTO categories (user_id, name, is_income, icon) VALUES (?, ?, ?, ?)",
                params![user_id, name, is_income, icon],
            )?;
        }

        info!("Seeded {} default categories for user {}", added, user_id);
        Ok(added)
    }

    /// Create a merchant; names are unique per user
    pub fn create_merchant(&self, user_id: i64, name: &str) -> Result<Merchant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Merchant name is empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO merchants (user_id, name) VALUES (?, ?)",
            params![user_id, name],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Validation(format!("Merchant '{}' already exists", name))
            } else {
                e.into()
            }
        })?;

        Ok(Merchant {
            id: conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
        })
    }

    /// Merchants ordered by ID
    pub fn get_merchants(&self, user_id: i64) -> Result<Vec<Merchant>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, user_id, name FROM merchants WHERE user_id = ? ORDER BY id")?;

        let merchants = stmt
            .query_map(params![user_id], |row| {
                Ok(Merchant {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(merchants)
    }
}
