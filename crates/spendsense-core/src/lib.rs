//! SpendSense Core Library
//!
//! Shared functionality for the SpendSense expense tracker:
//! - Database access and migrations
//! - CSV statement parsers for Indian banks and Paytm
//! - Deduplication of imported rows
//! - Category inference from remarks, keywords and merchant rules
//! - Budget and new-category alerts

pub mod alerts;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod fuzzy;
pub mod importer;
pub mod ledger;
pub mod models;
pub mod parsers;
pub mod resolver;
pub mod rules;
pub mod store;

pub use alerts::{AlertEngine, AlertOutcome, BudgetEvaluator, CrossedThreshold, GoalBudgetEvaluator};
pub use config::PipelineConfig;
pub use db::Database;
pub use dedup::DedupSet;
pub use error::{Error, Result};
pub use fuzzy::FuzzyMatcher;
pub use importer::{BatchImporter, CategorizationBreakdown, ImportSummary};
pub use ledger::TransactionService;
pub use parsers::{ParsedStatement, Provider, SkippedRow, StatementLayout};
pub use resolver::{CategoryResolver, FallbackChain, ReferenceData, Resolution, ResolutionRule};
pub use rules::{MerchantRule, RuleTable};
pub use store::{ImportCommit, LedgerStore, TransactionInsertResult};
