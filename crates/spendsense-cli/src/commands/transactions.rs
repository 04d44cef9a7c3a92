//! Transaction command implementations

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use spendsense_core::{
    db::Database,
    models::{Direction, ManualTransaction, TransactionUpdate},
    PipelineConfig, TransactionInsertResult, TransactionService,
};

use super::truncate;

/// Arguments of `transactions add`
pub struct NewTransactionArgs<'a> {
    pub account: &'a str,
    pub date: &'a str,
    pub description: &'a str,
    pub amount: f64,
    pub credit: bool,
    pub category: Option<&'a str>,
    pub upi_ref: Option<String>,
    pub tags: &'a [String],
}

fn parse_date_arg(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{}' (expected YYYY-MM-DD)", s))
}

fn category_id_by_name(db: &Database, user_id: i64, name: &str) -> Result<i64> {
    Ok(db
        .find_category_by_name(user_id, name)?
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", name))?
        .id)
}

pub fn cmd_transactions_list(db: &Database, user_id: i64, limit: i64) -> Result<()> {
    let transactions = db.list_transactions(user_id, limit, 0)?;

    if transactions.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  spendsense import --file statement.csv --account \"HDFC Savings\"");
        return Ok(());
    }

    let categories = db.get_categories(user_id)?;

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.direction {
            Direction::Debit => format!("\x1b[31m₹{:.2}\x1b[0m", tx.amount), // Red for spending
            Direction::Credit => format!("\x1b[32m+₹{:.2}\x1b[0m", tx.amount), // Green for income
        };
        let category = tx
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.name.as_str())
            .unwrap_or("-");

        println!(
            "   [{}] {} │ {:>12} │ {:15} │ {}",
            tx.id,
            tx.txn_date.date(),
            amount_str,
            truncate(category, 15),
            truncate(&tx.description, 40)
        );
    }

    Ok(())
}

pub fn cmd_transactions_add(
    db: &Database,
    user_id: i64,
    config: &PipelineConfig,
    args: NewTransactionArgs<'_>,
) -> Result<()> {
    let account = db
        .find_account_by_name(user_id, args.account)?
        .ok_or_else(|| anyhow::anyhow!("Account not found: {}", args.account))?;

    let category_id = args
        .category
        .map(|name| category_id_by_name(db, user_id, name))
        .transpose()?;

    let tags = db.list_tags(user_id)?;
    let tag_ids = args
        .tags
        .iter()
        .map(|name| {
            tags.iter()
                .find(|t| t.name == name.trim())
                .map(|t| t.id)
                .ok_or_else(|| anyhow::anyhow!("Tag not found: {}", name))
        })
        .collect::<Result<Vec<i64>>>()?;

    let mut input = ManualTransaction::debit(
        account.id,
        parse_date_arg(args.date)?,
        args.description,
        args.amount,
    );
    if args.credit {
        input.direction = Direction::Credit;
    }
    input.category_id = category_id;
    input.upi_ref = args.upi_ref;
    input.tag_ids = tag_ids;

    let service = TransactionService::new(db, config)?;
    match service.create(user_id, input)? {
        TransactionInsertResult::Inserted(id) => {
            let tx = service.get(user_id, id)?;
            let category = match tx.category_id {
                Some(cid) => db
                    .get_categories(user_id)?
                    .into_iter()
                    .find(|c| c.id == cid)
                    .map(|c| c.name)
                    .unwrap_or_default(),
                None => "uncategorized".to_string(),
            };
            println!("✅ Added transaction {} ({})", id, category);
        }
        TransactionInsertResult::Duplicate => {
            println!("⏭️  Skipped: a transaction with this UPI reference already exists");
        }
    }

    Ok(())
}

pub fn cmd_transactions_categorize(
    db: &Database,
    user_id: i64,
    config: &PipelineConfig,
    id: i64,
    category: Option<&str>,
) -> Result<()> {
    let category_id = category
        .map(|name| category_id_by_name(db, user_id, name))
        .transpose()?;

    let service = TransactionService::new(db, config)?;
    let tx = service.update(
        user_id,
        id,
        TransactionUpdate {
            category_id: Some(category_id),
            ..Default::default()
        },
    )?;

    match tx.category_id {
        Some(_) if category.is_some() => println!("✅ Transaction {} categorized", id),
        Some(_) => println!("✅ Transaction {} re-categorized from its description", id),
        None => println!("⚠️  Transaction {} is now uncategorized", id),
    }

    Ok(())
}

pub fn cmd_transactions_delete(
    db: &Database,
    user_id: i64,
    config: &PipelineConfig,
    id: i64,
) -> Result<()> {
    TransactionService::new(db, config)?.delete(user_id, id)?;
    println!("✅ Deleted transaction {}", id);
    Ok(())
}
