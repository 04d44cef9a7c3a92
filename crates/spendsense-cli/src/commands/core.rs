//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `current_user` - Look up (or create) the acting user
//! - `load_config` - Load categorization rules
//! - `cmd_init` - Initialize the database
//! - `cmd_resolve` - Dry-run categorization of a description

use std::path::Path;

use anyhow::{Context, Result};
use spendsense_core::{db::Database, CategoryResolver, FallbackChain, PipelineConfig};

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn current_user(db: &Database, name: &str) -> Result<i64> {
    let user = db
        .get_or_create_user(name)
        .with_context(|| format!("Failed to load user '{}'", name))?;
    Ok(user.id)
}

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    PipelineConfig::load(path).context("Failed to load categorization rules")
}

pub fn cmd_init(db_path: &Path, user: &str, seed_categories: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let user_id = current_user(&db, user)?;
    println!("   User: {} (id: {})", user, user_id);

    if seed_categories {
        let added = db
            .seed_default_categories(user_id)
            .context("Failed to seed categories")?;
        println!("   Seeded {} default categories", added);
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add an account: spendsense accounts add \"HDFC Savings\" --provider hdfc");
    println!("  2. Import a statement: spendsense import --file statement.csv --account \"HDFC Savings\"");

    Ok(())
}

pub fn cmd_resolve(
    db: &Database,
    user_id: i64,
    config: &PipelineConfig,
    description: &str,
    chain: FallbackChain,
) -> Result<()> {
    let resolver = CategoryResolver::new(config)?;
    let categories = db.get_categories(user_id)?;
    let merchants = db.get_merchants(user_id)?;
    let reference = resolver.reference_data(&categories, &merchants);

    let resolution = resolver.resolve(description, &reference, chain);

    let category = resolution
        .category_id
        .and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.name.as_str())
        .unwrap_or("(none)");
    let merchant = resolution
        .merchant_id
        .and_then(|id| merchants.iter().find(|m| m.id == id))
        .map(|m| m.name.as_str())
        .unwrap_or("(none)");

    println!();
    println!("🔎 {}", description);
    if let Some(remark) = resolver.extract_remark(description) {
        println!("   Remark:   {}", remark);
    }
    println!("   Category: {}", category);
    println!("   Merchant: {}", merchant);
    println!("   Rule:     {}", resolution.rule);
    if let Some(name) = &resolution.new_category {
        println!("   ⚠️  Unknown category '{}' would raise an alert", name);
    }

    Ok(())
}
