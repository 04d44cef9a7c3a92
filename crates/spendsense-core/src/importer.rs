//! Batch import pipeline
//!
//! Drives a parsed statement through deduplication and categorization and
//! commits the result atomically:
//!
//! 1. Load the user's reference data once (categories, merchants, known
//!    unique keys, owned accounts)
//! 2. Walk rows in ascending date order (stable for equal timestamps)
//! 3. Skip rows for accounts the user doesn't own, and duplicates
//! 4. Resolve category and merchant with the full fallback chain
//! 5. Commit staged rows plus one new-category alert per distinct name
//! 6. Evaluate budget goals against the spending each category gained

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alerts::{AlertEngine, BudgetEvaluator, GoalBudgetEvaluator};
use crate::config::PipelineConfig;
use crate::dedup::DedupSet;
use crate::error::Result;
use crate::models::{Direction, NewAlert, NewTransaction, RawTransaction};
use crate::resolver::{CategoryResolver, FallbackChain, ResolutionRule};
use crate::store::LedgerStore;

/// How inserted rows were categorized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizationBreakdown {
    pub by_remark: usize,
    pub by_transfer: usize,
    pub by_merchant_rule: usize,
    pub by_default: usize,
    pub unresolved: usize,
}

impl CategorizationBreakdown {
    fn record(&mut self, rule: ResolutionRule) {
        match rule {
            ResolutionRule::Remark => self.by_remark += 1,
            ResolutionRule::Transfer => self.by_transfer += 1,
            ResolutionRule::MerchantRule => self.by_merchant_rule += 1,
            ResolutionRule::Default => self.by_default += 1,
            ResolutionRule::Unresolved => self.unresolved += 1,
        }
    }
}

/// Result of importing one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Rows written to storage
    pub inserted: usize,
    /// Rows skipped as already imported (in storage or earlier in the batch)
    pub duplicates: usize,
    /// Rows whose account the user does not own
    pub rejected: usize,
    /// Distinct category names suggested by unmatched remarks
    pub new_categories: Vec<String>,
    /// New-category alerts actually created
    pub alerts_created: usize,
    /// Budget alerts created after the commit
    pub budget_alerts: usize,
    pub breakdown: CategorizationBreakdown,
}

pub struct BatchImporter<'a> {
    store: &'a dyn LedgerStore,
    resolver: CategoryResolver,
    evaluator: Box<dyn BudgetEvaluator + 'a>,
}

impl<'a> BatchImporter<'a> {
    /// Importer with the default goal-based budget evaluator
    pub fn new(store: &'a dyn LedgerStore, config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            store,
            resolver: CategoryResolver::new(config)?,
            evaluator: Box::new(GoalBudgetEvaluator::new(store)),
        })
    }

    /// Replace the budget evaluator
    pub fn with_evaluator(mut self, evaluator: Box<dyn BudgetEvaluator + 'a>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn import(&self, user_id: i64, mut rows: Vec<RawTransaction>) -> Result<ImportSummary> {
        let categories = self.store.list_categories(user_id)?;
        let merchants = self.store.list_merchants(user_id)?;
        let accounts = self.store.account_ids(user_id)?;
        let mut dedup = DedupSet::new(self.store.unique_keys(user_id)?);
        let reference = self.resolver.reference_data(&categories, &merchants);

        // sort_by_key is stable
        rows.sort_by_key(|r| r.txn_date);

        let mut summary = ImportSummary::default();
        let mut staged: Vec<NewTransaction> = Vec::with_capacity(rows.len());
        let mut rules: Vec<ResolutionRule> = Vec::with_capacity(rows.len());
        let mut new_names: BTreeSet<String> = BTreeSet::new();

        for raw in rows {
            if !accounts.contains(&raw.account_id) {
                warn!(
                    "Skipping row for account {} not owned by user {}: {}",
                    raw.account_id, user_id, raw.description
                );
                summary.rejected += 1;
                continue;
            }

            let key = raw.unique_key();
            if !dedup.admit(key.as_deref()) {
                debug!(unique_key = ?key, "Duplicate row skipped");
                summary.duplicates += 1;
                continue;
            }

            let resolution = self
                .resolver
                .resolve(&raw.description, &reference, FallbackChain::Full);
            if let Some(name) = resolution.new_category {
                new_names.insert(name);
            }

            rules.push(resolution.rule);
            staged.push(NewTransaction::from_raw(
                raw,
                resolution.category_id,
                resolution.merchant_id,
            ));
        }

        summary.new_categories = new_names.iter().cloned().collect();

        if staged.is_empty() && new_names.is_empty() {
            info!(
                "Nothing to import for user {} ({} duplicates, {} rejected)",
                user_id, summary.duplicates, summary.rejected
            );
            return Ok(summary);
        }

        let alerts: Vec<NewAlert> = new_names.iter().map(|n| NewAlert::new_category(n)).collect();
        let commit = self.store.commit_import(user_id, &staged, &alerts)?;

        // Debit spending added per (category, year, month), in first-seen order
        let mut months: HashMap<(i64, i32, u32), usize> = HashMap::new();
        let mut to_evaluate: Vec<(i64, NaiveDateTime, f64)> = Vec::new();

        for ((tx, id), rule) in staged.iter().zip(&commit.transaction_ids).zip(&rules) {
            if id.is_none() {
                // Lost a race with a concurrent import of the same row
                summary.duplicates += 1;
                continue;
            }
            summary.inserted += 1;
            summary.breakdown.record(*rule);

            if let (Some(category_id), Direction::Debit) = (tx.category_id, tx.direction) {
                let month = (category_id, tx.txn_date.year(), tx.txn_date.month());
                let slot = *months.entry(month).or_insert_with(|| {
                    to_evaluate.push((category_id, tx.txn_date, 0.0));
                    to_evaluate.len() - 1
                });
                to_evaluate[slot].2 += tx.amount;
            }
        }
        summary.alerts_created = commit.alert_ids.iter().flatten().count();

        let engine = AlertEngine::new(self.store);
        for (category_id, at, added) in to_evaluate {
            summary.budget_alerts += engine
                .evaluate_budgets(self.evaluator.as_ref(), user_id, category_id, at, added)?
                .len();
        }

        info!(
            "Imported {} transactions for user {} ({} duplicates, {} rejected, {} new categories)",
            summary.inserted,
            user_id,
            summary.duplicates,
            summary.rejected,
            summary.new_categories.len()
        );
        Ok(summary)
    }
}
