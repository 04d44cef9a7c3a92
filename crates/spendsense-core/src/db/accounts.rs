//! Account operations

use std::collections::{HashMap, HashSet};

use rusqlite::{params, OptionalExtension, Row};

use super::{is_unique_violation, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, AccountType};

const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, account_type, provider, account_number, created_at";

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    let account_type_str: String = row.get(3)?;
    let created_at_str: String = row.get(6)?;

    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        account_type: account_type_str.parse().unwrap_or(AccountType::Savings),
        provider: row.get(4)?,
        account_number: row.get(5)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create an account; names are unique per user
    pub fn create_account(
        &self,
        user_id: i64,
        name: &str,
        account_type: AccountType,
        provider: &str,
        account_number: Option<&str>,
    ) -> Result<Account> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO accounts (user_id, name, account_type, provider, account_number) VALUES (?, ?, ?, ?, ?)",
            params![
                user_id,
                name.trim(),
                account_type.as_str(),
                provider.trim().to_lowercase(),
                account_number
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Validation(format!("Account '{}' already exists", name))
            } else {
                e.into()
            }
        })?;

        let id = conn.last_insert_rowid();
        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {}", id)))
    }

    /// List a user's accounts
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY name",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Get an owned account by ID
    pub fn get_account(&self, user_id: i64, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE id = ? AND user_id = ?",
                    ACCOUNT_COLUMNS
                ),
                params![id, user_id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Get an owned account by exact name
    pub fn find_account_by_name(&self, user_id: i64, name: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE name = ? AND user_id = ?",
                    ACCOUNT_COLUMNS
                ),
                params![name, user_id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Account name -> ID map, used to route wallet rows to accounts
    pub fn account_map(&self, user_id: i64) -> Result<HashMap<String, i64>> {
        Ok(self
            .list_accounts(user_id)?
            .into_iter()
            .map(|a| (a.name, a.id))
            .collect())
    }

    pub(crate) fn owned_account_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM accounts WHERE user_id = ?")?;

        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<i64>, _>>()?;

        Ok(ids)
    }
}
