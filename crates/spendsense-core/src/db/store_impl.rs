//! `LedgerStore` backed by SQLite

use std::collections::HashSet;

use chrono::NaiveDateTime;

use super::Database;
use crate::error::Result;
use crate::models::{Alert, Category, Goal, Merchant, NewAlert, NewTransaction, Transaction};
use crate::store::{ImportCommit, LedgerStore, TransactionInsertResult};

impl LedgerStore for Database {
    fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        self.get_categories(user_id)
    }

    fn list_merchants(&self, user_id: i64) -> Result<Vec<Merchant>> {
        self.get_merchants(user_id)
    }

    fn unique_keys(&self, user_id: i64) -> Result<Vec<String>> {
        self.get_unique_keys(user_id)
    }

    fn account_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        self.owned_account_ids(user_id)
    }

    fn commit_import(
        &self,
        user_id: i64,
        transactions: &[NewTransaction],
        alerts: &[NewAlert],
    ) -> Result<ImportCommit> {
        Database::commit_import(self, user_id, transactions, alerts)
    }

    fn insert_transaction(
        &self,
        user_id: i64,
        tx: &NewTransaction,
        tag_ids: &[i64],
        alerts: &[NewAlert],
    ) -> Result<TransactionInsertResult> {
        Database::insert_transaction(self, user_id, tx, tag_ids, alerts)
    }

    fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        Database::get_transaction(self, user_id, id)
    }

    fn update_transaction(
        &self,
        tx: &Transaction,
        tag_ids: Option<&[i64]>,
        alerts: &[NewAlert],
    ) -> Result<bool> {
        Database::update_transaction(self, tx, tag_ids, alerts)
    }

    fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool> {
        Database::delete_transaction(self, user_id, id)
    }

    fn list_transactions(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        Database::list_transactions(self, user_id, limit, offset)
    }

    fn transaction_tag_ids(&self, user_id: i64, transaction_id: i64) -> Result<Vec<i64>> {
        self.get_transaction_tag_ids(user_id, transaction_id)
    }

    fn owned_tag_ids(&self, user_id: i64, tag_ids: &[i64]) -> Result<HashSet<i64>> {
        self.get_owned_tag_ids(user_id, tag_ids)
    }

    fn insert_alert_if_absent(&self, user_id: i64, alert: &NewAlert) -> Result<Option<i64>> {
        self.create_alert(user_id, alert)
    }

    fn acknowledge_alert(&self, user_id: i64, alert_id: i64) -> Result<Option<Alert>> {
        Database::acknowledge_alert(self, user_id, alert_id)
    }

    fn list_alerts(&self, user_id: i64, include_acknowledged: bool) -> Result<Vec<Alert>> {
        Database::list_alerts(self, user_id, include_acknowledged)
    }

    fn get_goal(&self, user_id: i64, goal_id: i64) -> Result<Option<Goal>> {
        Database::get_goal(self, user_id, goal_id)
    }

    fn goals_for_category(&self, user_id: i64, category_id: i64) -> Result<Vec<Goal>> {
        self.get_goals_for_category(user_id, category_id)
    }

    fn category_spend(
        &self,
        user_id: i64,
        category_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<f64> {
        self.get_category_spend(user_id, category_id, from, to)
    }
}
