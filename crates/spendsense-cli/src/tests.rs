//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use spendsense_core::db::Database;
use spendsense_core::models::AccountType;
use spendsense_core::{FallbackChain, PipelineConfig};
use tempfile::NamedTempFile;

use crate::commands::{self, truncate, NewTransactionArgs};

fn setup_test_db() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let user_id = commands::current_user(&db, "tester").unwrap();
    db.seed_default_categories(user_id).unwrap();
    (db, user_id)
}

fn config() -> PipelineConfig {
    PipelineConfig::embedded().unwrap()
}

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const HDFC_CSV: &str = "Date,Narration,Chq./Ref.No.,Value Dt,Withdrawal Amt.,Deposit Amt.,Closing Balance
05/01/24,UPI-ZOMATO-zomato@hdfc-401234567890-/food/,0000401234567890,05/01/24,250.00,,10000.00
06/01/24,IMPS-V REVATHI-rent share,IMPS0106,06/01/24,5000.00,,5000.00
07/01/24,UPI-CAFE-/snacks/,0000401234567891,07/01/24,60.00,,4940.00
";

fn add_tx(db: &Database, user_id: i64, description: &str, category: Option<&str>) {
    commands::cmd_transactions_add(
        db,
        user_id,
        &config(),
        NewTransactionArgs {
            account: "HDFC Savings",
            date: "2024-01-05",
            description,
            amount: 120.0,
            credit: false,
            category,
            upi_ref: None,
            tags: &[],
        },
    )
    .unwrap();
}

fn with_account(db: &Database, user_id: i64) {
    commands::cmd_accounts_add(db, user_id, "HDFC Savings", "hdfc", "savings", None).unwrap();
}

// ========== Init Command Tests ==========

#[test]
fn test_cmd_init_seeds_categories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spendsense.db");

    commands::cmd_init(&path, "asha", true).unwrap();
    // Running init again is harmless
    commands::cmd_init(&path, "asha", true).unwrap();

    let db = commands::open_db(&path).unwrap();
    let user = db.find_user("asha").unwrap().unwrap();
    assert_eq!(
        db.get_categories(user.id).unwrap().len(),
        spendsense_core::db::DEFAULT_CATEGORIES.len()
    );
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import_auto_detects_hdfc() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    let file = csv_file(HDFC_CSV);

    let summary = commands::cmd_import(
        &db,
        user_id,
        &config(),
        file.path(),
        Some("HDFC Savings"),
        None,
    )
    .unwrap();

    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.breakdown.by_remark, 1);
    assert_eq!(summary.breakdown.by_transfer, 1);
    assert_eq!(summary.new_categories, vec!["Snacks".to_string()]);

    // Second import is a no-op
    let again = commands::cmd_import(
        &db,
        user_id,
        &config(),
        file.path(),
        Some("HDFC Savings"),
        Some("hdfc"),
    )
    .unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 3);
}

#[test]
fn test_cmd_import_requires_known_account() {
    let (db, user_id) = setup_test_db();
    let file = csv_file(HDFC_CSV);

    let missing = commands::cmd_import(&db, user_id, &config(), file.path(), None, None);
    assert!(missing.unwrap_err().to_string().contains("--account"));

    let unknown =
        commands::cmd_import(&db, user_id, &config(), file.path(), Some("Nope"), None);
    assert!(unknown.unwrap_err().to_string().contains("Account not found"));
}

#[test]
fn test_cmd_import_rejects_unknown_format() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    let file = csv_file("Foo,Bar\n1,2\n");

    let result = commands::cmd_import(&db, user_id, &config(), file.path(), Some("HDFC Savings"), None);
    assert!(result.is_err());

    let result = commands::cmd_import(
        &db,
        user_id,
        &config(),
        file.path(),
        Some("HDFC Savings"),
        Some("chase"),
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_import_paytm_matches_accounts() {
    let (db, user_id) = setup_test_db();
    db.create_account(user_id, "HDFC Bank", AccountType::Savings, "hdfc", None)
        .unwrap();
    let file = csv_file(
        "Date,Time,Transaction Details,Other Transaction Details (UPI ID or A/c No),Your Account,Amount,UPI Ref No.,Order ID,Remarks,Tags,Comment
12/03/2024,19:30:05,Paid to Swiggy,swiggy@axis,HDFC Bank - 1234,-350.00,407212345678,,,,
",
    );

    let summary = commands::cmd_import(&db, user_id, &config(), file.path(), None, None).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.breakdown.by_merchant_rule, 1);
}

// ========== Account / Category / Tag Command Tests ==========

#[test]
fn test_cmd_accounts_add_and_list() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    assert!(commands::cmd_accounts_list(&db, user_id).is_ok());
    assert_eq!(db.list_accounts(user_id).unwrap().len(), 1);

    let bad_type = commands::cmd_accounts_add(&db, user_id, "X", "hdfc", "piggybank", None);
    assert!(bad_type.is_err());
}

#[test]
fn test_cmd_categories_add_duplicate() {
    let (db, user_id) = setup_test_db();
    commands::cmd_categories_add(&db, user_id, "Pets", false, Some("🐶")).unwrap();
    assert!(commands::cmd_categories_add(&db, user_id, "pets", false, None).is_err());
    assert!(commands::cmd_categories_list(&db, user_id).is_ok());
}

#[test]
fn test_cmd_merchants_and_tags() {
    let (db, user_id) = setup_test_db();
    commands::cmd_merchants_add(&db, user_id, "Zomato").unwrap();
    commands::cmd_tags_add(&db, user_id, "work").unwrap();

    assert!(commands::cmd_merchants_list(&db, user_id).is_ok());
    assert!(commands::cmd_tags_list(&db, user_id).is_ok());
    assert_eq!(db.get_merchants(user_id).unwrap().len(), 1);
    assert_eq!(db.list_tags(user_id).unwrap().len(), 1);
}

// ========== Goal / Alert Command Tests ==========

#[test]
fn test_cmd_goals_add_and_delete() {
    let (db, user_id) = setup_test_db();
    commands::cmd_goals_add(&db, user_id, "Eating out", "food", 5000.0, &[50.0, 100.0]).unwrap();

    let goals = db.list_goals(user_id).unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].thresholds, vec![50.0, 100.0]);
    assert!(commands::cmd_goals_list(&db, user_id).is_ok());

    assert!(commands::cmd_goals_add(&db, user_id, "x", "Nope", 10.0, &[50.0]).is_err());

    commands::cmd_goals_delete(&db, user_id, goals[0].id).unwrap();
    assert!(commands::cmd_goals_delete(&db, user_id, goals[0].id).is_err());
}

#[test]
fn test_cmd_alerts_list_and_ack() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    add_tx(&db, user_id, "/gadgets/ new phone", None);

    let alerts = db.list_alerts(user_id, false).unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(commands::cmd_alerts_list(&db, user_id, false).is_ok());

    commands::cmd_alerts_ack(&db, user_id, alerts[0].id).unwrap();
    assert!(db.list_alerts(user_id, false).unwrap().is_empty());
    assert!(commands::cmd_alerts_list(&db, user_id, true).is_ok());

    assert!(commands::cmd_alerts_ack(&db, user_id, 9999).is_err());
}

// ========== Transaction Command Tests ==========

#[test]
fn test_cmd_transactions_add_with_remark() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    add_tx(&db, user_id, "lunch /food/", None);

    let txs = db.list_transactions(user_id, 10, 0).unwrap();
    assert_eq!(txs.len(), 1);
    let food = db.find_category_by_name(user_id, "Food").unwrap().unwrap();
    assert_eq!(txs[0].category_id, Some(food.id));
    assert_eq!(txs[0].source, "manual");
    assert!(commands::cmd_transactions_list(&db, user_id, 20).is_ok());
}

#[test]
fn test_cmd_transactions_add_unknown_tag() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    let tags = vec!["nope".to_string()];

    let result = commands::cmd_transactions_add(
        &db,
        user_id,
        &config(),
        NewTransactionArgs {
            account: "HDFC Savings",
            date: "2024-01-05",
            description: "x",
            amount: 1.0,
            credit: false,
            category: None,
            upi_ref: None,
            tags: &tags,
        },
    );
    assert!(result.is_err());
    assert_eq!(db.count_transactions(user_id).unwrap(), 0);
}

#[test]
fn test_cmd_transactions_categorize() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    add_tx(&db, user_id, "weekly shop /groceries/", Some("Shopping"));
    let id = db.list_transactions(user_id, 1, 0).unwrap()[0].id;

    // No category given: infer again from the description
    commands::cmd_transactions_categorize(&db, user_id, &config(), id, None).unwrap();
    let groceries = db.find_category_by_name(user_id, "Groceries").unwrap().unwrap();
    assert_eq!(
        db.get_transaction(user_id, id).unwrap().unwrap().category_id,
        Some(groceries.id)
    );

    commands::cmd_transactions_categorize(&db, user_id, &config(), id, Some("Shopping")).unwrap();
    let shopping = db.find_category_by_name(user_id, "Shopping").unwrap().unwrap();
    assert_eq!(
        db.get_transaction(user_id, id).unwrap().unwrap().category_id,
        Some(shopping.id)
    );
}

#[test]
fn test_cmd_transactions_delete() {
    let (db, user_id) = setup_test_db();
    with_account(&db, user_id);
    add_tx(&db, user_id, "coffee", None);
    let id = db.list_transactions(user_id, 1, 0).unwrap()[0].id;

    commands::cmd_transactions_delete(&db, user_id, &config(), id).unwrap();
    assert!(commands::cmd_transactions_delete(&db, user_id, &config(), id).is_err());
}

#[test]
fn test_cmd_resolve() {
    let (db, user_id) = setup_test_db();
    let config = config();
    assert!(commands::cmd_resolve(&db, user_id, &config, "UPI-SWIGGY-order", FallbackChain::Full).is_ok());
    assert!(commands::cmd_resolve(&db, user_id, &config, "/xyz/", FallbackChain::RemarkOnly).is_ok());
    // Dry run: nothing written
    assert!(db.list_alerts(user_id, true).unwrap().is_empty());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long description here", 10), "a long ...");
    assert_eq!(truncate("₹₹₹₹₹₹", 5), "₹₹...");
}
