//! Transaction operations

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use super::alerts::insert_alert;
use super::tags::replace_transaction_tags;
use super::{format_txn_date, is_unique_violation, parse_datetime, parse_txn_date, Database};
use crate::error::Result;
use crate::models::{NewAlert, NewTransaction, Transaction};
use crate::store::{ImportCommit, TransactionInsertResult};

const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, txn_date, description, amount, direction, source, \
     category_id, merchant_id, unique_key, upi_ref, raw_data, created_at";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let txn_date: String = row.get(3)?;
    let direction: String = row.get(6)?;
    let raw_data: Option<String> = row.get(12)?;
    let created_at: String = row.get(13)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        txn_date: parse_txn_date(&txn_date)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        direction: direction.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, e.into())
        })?,
        source: row.get(7)?,
        category_id: row.get(8)?,
        merchant_id: row.get(9)?,
        unique_key: row.get(10)?,
        upi_ref: row.get(11)?,
        raw_data: raw_data.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_datetime(&created_at),
    })
}

/// Insert one row, returning `None` when a uniqueness rule rejected it
pub(super) fn insert_row(
    conn: &Connection,
    user_id: i64,
    tx: &NewTransaction,
) -> rusqlite::Result<Option<i64>> {
    let raw_data = tx.raw_data.as_ref().map(|v| v.to_string());

    let changed = conn.execute(
        r#"
        INSERT INTO transactions (user_id, account_id, txn_date, description, amount, direction, source,
                                  category_id, merchant_id, unique_key, upi_ref, raw_data)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
        params![
            user_id,
            tx.account_id,
            format_txn_date(&tx.txn_date),
            tx.description,
            tx.amount,
            tx.direction.as_str(),
            tx.source,
            tx.category_id,
            tx.merchant_id,
            tx.unique_key,
            tx.upi_ref,
            raw_data,
        ],
    )?;

    if changed == 0 {
        debug!(unique_key = ?tx.unique_key, upi_ref = ?tx.upi_ref, "Duplicate transaction skipped at insert");
        return Ok(None);
    }

    Ok(Some(conn.last_insert_rowid()))
}

fn insert_alerts(conn: &Connection, user_id: i64, alerts: &[NewAlert]) -> rusqlite::Result<()> {
    for alert in alerts {
        match insert_alert(conn, user_id, alert)? {
            Some(id) => info!("Alert {} raised for user {}", id, user_id),
            None => debug!(alert_type = alert.alert_type.as_str(), "Alert already open"),
        }
    }
    Ok(())
}

impl Database {
    /// Insert staged transactions and alerts in one write transaction
    ///
    /// Uses `BEGIN IMMEDIATE` so concurrent imports queue on the write lock
    /// instead of failing mid-batch.
    pub fn commit_import(
        &self,
        user_id: i64,
        transactions: &[NewTransaction],
        alerts: &[NewAlert],
    ) -> Result<ImportCommit> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut commit = ImportCommit::default();
        for row in transactions {
            commit.transaction_ids.push(insert_row(&tx, user_id, row)?);
        }
        for alert in alerts {
            commit.alert_ids.push(insert_alert(&tx, user_id, alert)?);
        }

        tx.commit()?;

        info!(
            "Committed {} of {} transactions and {} of {} alerts for user {}",
            commit.transaction_ids.iter().flatten().count(),
            transactions.len(),
            commit.alert_ids.iter().flatten().count(),
            alerts.len(),
            user_id
        );
        Ok(commit)
    }

    /// Insert a single transaction with its tags and the alerts it raised
    ///
    /// A duplicate rolls back without writing the alerts.
    pub fn insert_transaction(
        &self,
        user_id: i64,
        new_tx: &NewTransaction,
        tag_ids: &[i64],
        alerts: &[NewAlert],
    ) -> Result<TransactionInsertResult> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(id) = insert_row(&tx, user_id, new_tx)? else {
            return Ok(TransactionInsertResult::Duplicate);
        };
        replace_transaction_tags(&tx, id, tag_ids)?;
        insert_alerts(&tx, user_id, alerts)?;

        tx.commit()?;
        Ok(TransactionInsertResult::Inserted(id))
    }

    /// Get an owned transaction
    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
                    TRANSACTION_COLUMNS
                ),
                params![id, user_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// Write back an edited transaction, optionally replacing its tags
    ///
    /// Returns false if the row is gone or a uniqueness rule rejected it;
    /// `alerts` are only written when the update goes through.
    pub fn update_transaction(
        &self,
        updated: &Transaction,
        tag_ids: Option<&[i64]>,
        alerts: &[NewAlert],
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = tx.execute(
            r#"
            UPDATE transactions
            SET txn_date = ?, description = ?, amount = ?, direction = ?,
                category_id = ?, merchant_id = ?, unique_key = ?, upi_ref = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                format_txn_date(&updated.txn_date),
                updated.description,
                updated.amount,
                updated.direction.as_str(),
                updated.category_id,
                updated.merchant_id,
                updated.unique_key,
                updated.upi_ref,
                updated.id,
                updated.user_id,
            ],
        );

        let changed = match result {
            Ok(n) => n,
            Err(e) if is_unique_violation(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if changed == 0 {
            return Ok(false);
        }

        if let Some(tag_ids) = tag_ids {
            replace_transaction_tags(&tx, updated.id, tag_ids)?;
        }
        insert_alerts(&tx, updated.user_id, alerts)?;

        tx.commit()?;
        Ok(true)
    }

    /// Delete an owned transaction; its tag links cascade
    pub fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY txn_date DESC, id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id, limit, offset], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count a user's transactions
    pub fn count_transactions(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All stored unique keys for a user
    pub fn get_unique_keys(&self, user_id: i64) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT unique_key FROM transactions WHERE user_id = ? AND unique_key IS NOT NULL",
        )?;

        let keys = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(keys)
    }

    /// Sum of debits in a category within `[from, to)`
    pub fn get_category_spend(
        &self,
        user_id: i64,
        category_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<f64> {
        let conn = self.conn()?;
        let total = conn.query_row(
            r#"
            SELECT COALESCE(SUM(amount), 0.0)
            FROM transactions
            WHERE user_id = ? AND category_id = ? AND direction = 'debit'
              AND txn_date >= ? AND txn_date < ?
            "#,
            params![
                user_id,
                category_id,
                format_txn_date(&from),
                format_txn_date(&to)
            ],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
