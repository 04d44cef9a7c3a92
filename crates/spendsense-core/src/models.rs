//! Domain models for SpendSense

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dedup;
use crate::error::{Error, Result};

/// A person whose data is isolated from every other user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Kinds of accounts a statement can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Savings,
    Current,
    Credit,
    Wallet,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Current => "current",
            Self::Credit => "credit",
            Self::Wallet => "wallet",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "savings" => Ok(Self::Savings),
            "current" | "checking" => Ok(Self::Current),
            "credit" | "credit_card" => Ok(Self::Credit),
            "wallet" => Ok(Self::Wallet),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank or wallet account owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    /// Unique per user
    pub name: String,
    pub account_type: AccountType,
    /// Statement provider (e.g. "hdfc", "paytm")
    pub provider: String,
    pub account_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Money direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" | "dr" => Ok(Self::Debit),
            "credit" | "cr" => Ok(Self::Credit),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction as produced by a statement parser, before import
///
/// Construction validates the fields the pipeline relies on, so malformed
/// rows are rejected at the parse boundary instead of inside the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub account_id: i64,
    pub txn_date: NaiveDateTime,
    pub description: String,
    /// Always positive; the sign lives in `direction`
    pub amount: f64,
    pub direction: Direction,
    /// Provider tag, first segment of the unique key
    pub source: String,
    /// Provider reference used to build the unique key. `None` means the
    /// provider gives no stable identity and the row is never deduplicated.
    pub id_part: Option<String>,
    pub upi_ref: Option<String>,
    /// Original statement row, preserved verbatim
    pub raw_data: Option<Value>,
}

impl RawTransaction {
    pub fn new(
        account_id: i64,
        txn_date: NaiveDateTime,
        description: impl Into<String>,
        amount: f64,
        direction: Direction,
        source: impl Into<String>,
    ) -> Result<Self> {
        let description = description.into();
        let source = source.into();

        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidData(format!(
                "Amount must be a positive number, got {}",
                amount
            )));
        }
        if description.trim().is_empty() {
            return Err(Error::InvalidData("Description is empty".into()));
        }
        if source.trim().is_empty() {
            return Err(Error::InvalidData("Source is empty".into()));
        }

        Ok(Self {
            account_id,
            txn_date,
            description,
            amount,
            direction,
            source,
            id_part: None,
            upi_ref: None,
            raw_data: None,
        })
    }

    pub fn with_id_part(mut self, id_part: impl Into<String>) -> Self {
        self.id_part = Some(id_part.into());
        self
    }

    pub fn with_upi_ref(mut self, upi_ref: Option<String>) -> Self {
        self.upi_ref = upi_ref;
        self
    }

    pub fn with_raw_data(mut self, raw_data: Value) -> Self {
        self.raw_data = Some(raw_data);
        self
    }

    /// Dedup fingerprint, `None` when the provider gives no id part
    pub fn unique_key(&self) -> Option<String> {
        self.id_part
            .as_deref()
            .map(|part| dedup::unique_key(&self.source, part, self.txn_date.date(), self.amount))
    }
}

/// A persisted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub txn_date: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub direction: Direction,
    pub source: String,
    pub category_id: Option<i64>,
    pub merchant_id: Option<i64>,
    /// Hash-free dedup fingerprint, unique per user
    pub unique_key: Option<String>,
    pub upi_ref: Option<String>,
    pub raw_data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// A transaction staged for insertion (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub txn_date: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub direction: Direction,
    pub source: String,
    pub category_id: Option<i64>,
    pub merchant_id: Option<i64>,
    pub unique_key: Option<String>,
    pub upi_ref: Option<String>,
    pub raw_data: Option<Value>,
}

impl NewTransaction {
    /// Stage a parsed transaction with the categorization outcome applied
    pub fn from_raw(raw: RawTransaction, category_id: Option<i64>, merchant_id: Option<i64>) -> Self {
        let unique_key = raw.unique_key();
        Self {
            account_id: raw.account_id,
            txn_date: raw.txn_date,
            description: raw.description,
            amount: raw.amount,
            direction: raw.direction,
            source: raw.source,
            category_id,
            merchant_id,
            unique_key,
            upi_ref: raw.upi_ref,
            raw_data: raw.raw_data,
        }
    }
}

/// Input for the single-transaction create path
#[derive(Debug, Clone)]
pub struct ManualTransaction {
    pub account_id: i64,
    pub txn_date: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub direction: Direction,
    /// When `None`, the category is inferred from the description
    pub category_id: Option<i64>,
    pub merchant_id: Option<i64>,
    pub upi_ref: Option<String>,
    pub tag_ids: Vec<i64>,
}

impl ManualTransaction {
    /// A debit with everything optional left unset
    pub fn debit(
        account_id: i64,
        txn_date: NaiveDateTime,
        description: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            account_id,
            txn_date,
            description: description.into(),
            amount,
            direction: Direction::Debit,
            category_id: None,
            merchant_id: None,
            upi_ref: None,
            tag_ids: Vec::new(),
        }
    }
}

/// Partial update of a transaction
///
/// `category_id: Some(None)` explicitly clears the category, which re-runs
/// category inference on the (possibly new) description.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub txn_date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub direction: Option<Direction>,
    pub category_id: Option<Option<i64>>,
    pub merchant_id: Option<Option<i64>>,
    /// Replaces the whole tag set when present
    pub tag_ids: Option<Vec<i64>>,
}

/// A spending category owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    /// Unique per user
    pub name: String,
    pub is_income: bool,
    pub icon: Option<String>,
}

/// A merchant owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Merchant {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// A free-form label that can be attached to many transactions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// Default thresholds for a new goal, in percent of the target
pub const DEFAULT_THRESHOLDS: [f64; 3] = [50.0, 80.0, 100.0];

/// A monthly budget for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub category_id: i64,
    /// Monthly spending target
    pub target_amount: f64,
    /// Ascending percentages of the target that raise an alert
    pub thresholds: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

/// Alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Spending in a goal's category crossed a threshold
    Budget,
    /// A remark named a category the user does not have
    NewCategory,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::NewCategory => "new_category",
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "budget" => Ok(Self::Budget),
            "new_category" => Ok(Self::NewCategory),
            _ => Err(format!("Unknown alert type: {}", s)),
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    pub alert_type: AlertType,
    /// Only for budget alerts
    pub goal_id: Option<i64>,
    /// Only for budget alerts
    pub threshold_percentage: Option<f64>,
    pub context: Option<Value>,
    pub triggered_at: DateTime<Utc>,
    pub is_acknowledged: bool,
}

impl Alert {
    /// Category name carried by a new-category alert
    pub fn category_name(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.get("category_name"))
            .and_then(Value::as_str)
    }
}

/// An alert about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub goal_id: Option<i64>,
    pub threshold_percentage: Option<f64>,
    pub context: Option<Value>,
}

impl NewAlert {
    pub fn budget(goal_id: i64, threshold_percentage: f64) -> Self {
        Self {
            alert_type: AlertType::Budget,
            goal_id: Some(goal_id),
            threshold_percentage: Some(round_percentage(threshold_percentage)),
            context: None,
        }
    }

    pub fn new_category(category_name: &str) -> Self {
        Self {
            alert_type: AlertType::NewCategory,
            goal_id: None,
            threshold_percentage: None,
            context: Some(json!({ "category_name": category_name })),
        }
    }

    /// The category name for new-category alerts
    pub fn category_name(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.get("category_name"))
            .and_then(Value::as_str)
    }
}

/// Percentages are stored with two decimals
pub fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_raw_transaction_rejects_bad_amounts() {
        assert!(RawTransaction::new(1, at(2024, 1, 1), "x", 0.0, Direction::Debit, "hdfc").is_err());
        assert!(RawTransaction::new(1, at(2024, 1, 1), "x", -5.0, Direction::Debit, "hdfc").is_err());
        assert!(
            RawTransaction::new(1, at(2024, 1, 1), "x", f64::NAN, Direction::Debit, "hdfc").is_err()
        );
        assert!(RawTransaction::new(1, at(2024, 1, 1), "  ", 5.0, Direction::Debit, "hdfc").is_err());
    }

    #[test]
    fn test_raw_transaction_unique_key() {
        let raw = RawTransaction::new(1, at(2024, 3, 9), "ZOMATO", 250.5, Direction::Debit, "hdfc")
            .unwrap();
        assert_eq!(raw.unique_key(), None);

        let raw = raw.with_id_part("REF123");
        assert_eq!(
            raw.unique_key().as_deref(),
            Some("hdfc-REF123-20240309-250.50")
        );
    }

    #[test]
    fn test_new_category_alert_context() {
        let alert = NewAlert::new_category("Xyz");
        assert_eq!(alert.alert_type, AlertType::NewCategory);
        assert_eq!(alert.category_name(), Some("Xyz"));
        assert_eq!(alert.goal_id, None);
    }

    #[test]
    fn test_budget_alert_threshold_rounding() {
        let alert = NewAlert::budget(7, 80.004);
        assert_eq!(alert.threshold_percentage, Some(80.0));
        assert_eq!(alert.goal_id, Some(7));
    }

    #[test]
    fn test_alert_type_round_trip() {
        assert_eq!("budget".parse::<AlertType>().unwrap(), AlertType::Budget);
        assert_eq!(
            "new_category".parse::<AlertType>().unwrap(),
            AlertType::NewCategory
        );
        assert!("zombie".parse::<AlertType>().is_err());
    }
}
