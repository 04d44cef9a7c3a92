//! Persistence interface consumed by the import pipeline and alert engine
//!
//! Every method is scoped by `user_id`. Implementations must enforce the
//! uniqueness rules as storage constraints:
//!
//! - `(user_id, unique_key)` and `(user_id, upi_ref)` on transactions
//! - one open budget alert per `(user_id, goal_id, threshold_percentage)`
//! - one open new-category alert per `(user_id, category_name)`
//!
//! A write that collides with one of these is reported as a duplicate, never
//! as an error.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::{Alert, Category, Goal, Merchant, NewAlert, NewTransaction, Transaction};

/// Result of inserting a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionInsertResult {
    /// Transaction was inserted, contains the new ID
    Inserted(i64),
    /// A transaction with the same unique key or UPI reference already exists
    Duplicate,
}

/// Outcome of an atomic import commit
///
/// Both vectors are parallel to the commit input; `None` marks a row that
/// collided with an existing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportCommit {
    pub transaction_ids: Vec<Option<i64>>,
    pub alert_ids: Vec<Option<i64>>,
}

pub trait LedgerStore: Send + Sync {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>>;

    fn list_merchants(&self, user_id: i64) -> Result<Vec<Merchant>>;

    /// All non-null transaction unique keys for a user
    fn unique_keys(&self, user_id: i64) -> Result<Vec<String>>;

    /// IDs of the accounts a user owns
    fn account_ids(&self, user_id: i64) -> Result<HashSet<i64>>;

    /// Insert staged transactions and alerts in one atomic unit
    fn commit_import(
        &self,
        user_id: i64,
        transactions: &[NewTransaction],
        alerts: &[NewAlert],
    ) -> Result<ImportCommit>;

    /// Insert a transaction, its tag links and any alerts it raised atomically
    ///
    /// On `Duplicate` nothing is written, alerts included.
    fn insert_transaction(
        &self,
        user_id: i64,
        tx: &NewTransaction,
        tag_ids: &[i64],
        alerts: &[NewAlert],
    ) -> Result<TransactionInsertResult>;

    fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>>;

    /// Write back a modified transaction, replacing its tags when given, and
    /// insert the alerts the change raised in the same unit
    ///
    /// Returns false, having written nothing, when the row is gone or a
    /// uniqueness rule rejected the change.
    fn update_transaction(
        &self,
        tx: &Transaction,
        tag_ids: Option<&[i64]>,
        alerts: &[NewAlert],
    ) -> Result<bool>;

    /// Returns false if no owned transaction had that ID
    fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool>;

    fn list_transactions(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Transaction>>;

    fn transaction_tag_ids(&self, user_id: i64, transaction_id: i64) -> Result<Vec<i64>>;

    /// The subset of `tag_ids` the user owns
    fn owned_tag_ids(&self, user_id: i64, tag_ids: &[i64]) -> Result<HashSet<i64>>;

    /// Insert an alert unless an equivalent open one exists
    ///
    /// Returns the new alert ID, or `None` when one was already open.
    fn insert_alert_if_absent(&self, user_id: i64, alert: &NewAlert) -> Result<Option<i64>>;

    /// Mark an owned alert acknowledged; `None` if missing or not owned
    fn acknowledge_alert(&self, user_id: i64, alert_id: i64) -> Result<Option<Alert>>;

    /// Alerts newest first, optionally including acknowledged ones
    fn list_alerts(&self, user_id: i64, include_acknowledged: bool) -> Result<Vec<Alert>>;

    fn get_goal(&self, user_id: i64, goal_id: i64) -> Result<Option<Goal>>;

    fn goals_for_category(&self, user_id: i64, category_id: i64) -> Result<Vec<Goal>>;

    /// Sum of debit amounts in a category within `[from, to)`
    fn category_spend(
        &self,
        user_id: i64,
        category_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<f64>;
}
