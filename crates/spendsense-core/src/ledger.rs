//! Single-transaction create, update and delete
//!
//! Unlike the batch importer, the single path resolves categories with the
//! configured fallback chain (remark only by default) and raises a
//! new-category alert as soon as a remark fails to match. The alert is
//! written together with the transaction, so a rejected write leaves none.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, info};

use crate::alerts::{AlertEngine, BudgetEvaluator, GoalBudgetEvaluator};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::models::{
    Direction, ManualTransaction, NewAlert, NewTransaction, Transaction, TransactionUpdate,
};
use crate::resolver::{CategoryResolver, FallbackChain, Resolution};
use crate::store::{LedgerStore, TransactionInsertResult};

/// Source tag for transactions entered by hand
pub const MANUAL_SOURCE: &str = "manual";

pub struct TransactionService<'a> {
    store: &'a dyn LedgerStore,
    resolver: CategoryResolver,
    chain: FallbackChain,
    evaluator: Box<dyn BudgetEvaluator + 'a>,
}

impl<'a> TransactionService<'a> {
    pub fn new(store: &'a dyn LedgerStore, config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            store,
            resolver: CategoryResolver::new(config)?,
            chain: config.single_create_fallback,
            evaluator: Box::new(GoalBudgetEvaluator::new(store)),
        })
    }

    /// Override the configured fallback chain
    pub fn with_chain(mut self, chain: FallbackChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn BudgetEvaluator + 'a>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn create(&self, user_id: i64, input: ManualTransaction) -> Result<TransactionInsertResult> {
        validate_amount(input.amount)?;

        if !self.store.account_ids(user_id)?.contains(&input.account_id) {
            return Err(Error::NotFound(format!("Account {}", input.account_id)));
        }
        let tag_ids = self.validate_tags(user_id, &input.tag_ids)?;

        let mut category_id = input.category_id;
        let mut merchant_id = input.merchant_id;
        let mut alerts = Vec::new();
        if let Some(id) = category_id {
            self.check_category(user_id, id)?;
        }
        if let Some(id) = merchant_id {
            self.check_merchant(user_id, id)?;
        }

        if category_id.is_none() && !input.description.trim().is_empty() {
            let resolution = self.resolve(user_id, &input.description)?;
            category_id = resolution.category_id;
            merchant_id = merchant_id.or(resolution.merchant_id);
            alerts.extend(resolution.new_category.as_deref().map(NewAlert::new_category));
        }

        let new_tx = NewTransaction {
            account_id: input.account_id,
            txn_date: input.txn_date,
            description: input.description,
            amount: input.amount,
            direction: input.direction,
            source: MANUAL_SOURCE.to_string(),
            category_id,
            merchant_id,
            unique_key: None,
            upi_ref: input.upi_ref.filter(|r| !r.trim().is_empty()),
            raw_data: None,
        };

        let result = self
            .store
            .insert_transaction(user_id, &new_tx, &tag_ids, &alerts)?;
        match result {
            TransactionInsertResult::Inserted(id) => {
                info!("Created transaction {} for user {}", id, user_id);
                if let (Some(category_id), Direction::Debit) = (category_id, new_tx.direction) {
                    self.evaluate_budgets(user_id, category_id, &new_tx.txn_date, new_tx.amount)?;
                }
            }
            TransactionInsertResult::Duplicate => {
                debug!(upi_ref = ?new_tx.upi_ref, "Manual transaction duplicates an existing one");
            }
        }

        Ok(result)
    }

    /// Apply a partial update to an owned transaction
    ///
    /// Clearing the category re-runs inference on the resulting description.
    pub fn update(&self, user_id: i64, id: i64, update: TransactionUpdate) -> Result<Transaction> {
        let mut tx = self.get(user_id, id)?;
        let previous = monthly_spend(&tx);
        let mut alerts = Vec::new();

        let tag_ids = match &update.tag_ids {
            Some(ids) => Some(self.validate_tags(user_id, ids)?),
            None => None,
        };

        if let Some(date) = update.txn_date {
            tx.txn_date = date;
        }
        if let Some(description) = update.description {
            tx.description = description;
        }
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
            tx.amount = amount;
        }
        if let Some(direction) = update.direction {
            tx.direction = direction;
        }
        if let Some(merchant_id) = update.merchant_id {
            if let Some(id) = merchant_id {
                self.check_merchant(user_id, id)?;
            }
            tx.merchant_id = merchant_id;
        }

        match update.category_id {
            Some(Some(category_id)) => {
                self.check_category(user_id, category_id)?;
                tx.category_id = Some(category_id);
            }
            Some(None) => {
                tx.category_id = None;
                if !tx.description.trim().is_empty() {
                    let resolution = self.resolve(user_id, &tx.description)?;
                    tx.category_id = resolution.category_id;
                    alerts.extend(resolution.new_category.as_deref().map(NewAlert::new_category));
                    if update.merchant_id.is_none() && resolution.merchant_id.is_some() {
                        tx.merchant_id = resolution.merchant_id;
                    }
                }
            }
            None => {}
        }

        if !self
            .store
            .update_transaction(&tx, tag_ids.as_deref(), &alerts)?
        {
            return Err(Error::Validation(format!(
                "Transaction {} conflicts with an existing transaction",
                id
            )));
        }
        info!("Updated transaction {} for user {}", id, user_id);

        // Only spending the edit adds to its category and month can cross
        if let Some((category_id, month, amount)) = monthly_spend(&tx) {
            let added = match previous {
                Some((c, m, before)) if c == category_id && m == month => amount - before,
                _ => amount,
            };
            self.evaluate_budgets(user_id, category_id, &tx.txn_date, added)?;
        }

        self.get(user_id, id)
    }

    /// Delete an owned transaction and its tag links
    pub fn delete(&self, user_id: i64, id: i64) -> Result<()> {
        if !self.store.delete_transaction(user_id, id)? {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        info!("Deleted transaction {} for user {}", id, user_id);
        Ok(())
    }

    pub fn get(&self, user_id: i64, id: i64) -> Result<Transaction> {
        self.store
            .get_transaction(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))
    }

    pub fn list(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        self.store.list_transactions(user_id, limit, offset)
    }

    pub fn tag_ids(&self, user_id: i64, id: i64) -> Result<Vec<i64>> {
        self.store.transaction_tag_ids(user_id, id)
    }

    /// Resolve a description against the user's current reference data
    ///
    /// Writes nothing; the caller stores any new-category alert with the
    /// transaction.
    fn resolve(&self, user_id: i64, description: &str) -> Result<Resolution> {
        let categories = self.store.list_categories(user_id)?;
        let merchants = self.store.list_merchants(user_id)?;
        let reference = self.resolver.reference_data(&categories, &merchants);

        let resolution = self.resolver.resolve(description, &reference, self.chain);
        if let Some(name) = &resolution.new_category {
            debug!(category = %name, "Remark names an unknown category");
        }
        Ok(resolution)
    }

    /// All tag IDs must exist and belong to the user
    fn validate_tags(&self, user_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>> {
        let mut seen = HashSet::new();
        let unique: Vec<i64> = tag_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let owned = self.store.owned_tag_ids(user_id, &unique)?;
        let invalid: Vec<String> = unique
            .iter()
            .filter(|id| !owned.contains(*id))
            .map(|id| id.to_string())
            .collect();

        if !invalid.is_empty() {
            return Err(Error::Validation(format!(
                "Invalid tag IDs: {}",
                invalid.join(", ")
            )));
        }

        Ok(unique)
    }

    fn check_category(&self, user_id: i64, category_id: i64) -> Result<()> {
        if self
            .store
            .list_categories(user_id)?
            .iter()
            .any(|c| c.id == category_id)
        {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Category {}", category_id)))
        }
    }

    fn check_merchant(&self, user_id: i64, merchant_id: i64) -> Result<()> {
        if self
            .store
            .list_merchants(user_id)?
            .iter()
            .any(|m| m.id == merchant_id)
        {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Merchant {}", merchant_id)))
        }
    }

    fn evaluate_budgets(
        &self,
        user_id: i64,
        category_id: i64,
        at: &NaiveDateTime,
        added: f64,
    ) -> Result<usize> {
        let created = AlertEngine::new(self.store).evaluate_budgets(
            self.evaluator.as_ref(),
            user_id,
            category_id,
            *at,
            added,
        )?;
        Ok(created.len())
    }
}

/// Debit spending a transaction contributes: (category, (year, month), amount)
fn monthly_spend(tx: &Transaction) -> Option<(i64, (i32, u32), f64)> {
    match (tx.category_id, tx.direction) {
        (Some(category_id), Direction::Debit) => Some((
            category_id,
            (tx.txn_date.year(), tx.txn_date.month()),
            tx.amount,
        )),
        _ => None,
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(format!(
            "Amount must be a positive number, got {}",
            amount
        )));
    }
    Ok(())
}
