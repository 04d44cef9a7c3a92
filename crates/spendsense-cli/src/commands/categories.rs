//! Category and merchant command implementations

use anyhow::Result;
use spendsense_core::db::Database;

pub fn cmd_categories_list(db: &Database, user_id: i64) -> Result<()> {
    let categories = db.get_categories(user_id)?;

    if categories.is_empty() {
        println!("No categories yet. Run 'spendsense init --seed-categories' for a starter set.");
        return Ok(());
    }

    println!();
    println!("🗂️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");

    for category in categories {
        let icon = category.icon.as_deref().unwrap_or("•");
        let income = if category.is_income { " (income)" } else { "" };
        println!("   {} {}{}", icon, category.name, income);
    }

    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    user_id: i64,
    name: &str,
    is_income: bool,
    icon: Option<&str>,
) -> Result<()> {
    let category = db.create_category(user_id, name, is_income, icon)?;
    println!("✅ Created category '{}' (id: {})", category.name, category.id);
    Ok(())
}

pub fn cmd_merchants_list(db: &Database, user_id: i64) -> Result<()> {
    let merchants = db.get_merchants(user_id)?;

    if merchants.is_empty() {
        println!("No merchants yet. Merchant rules only link merchants that exist, add one with:");
        println!("  spendsense merchants add Zomato");
        return Ok(());
    }

    println!();
    println!("🏪 Merchants");
    println!("   ─────────────────────────────────────────────────────────────");
    for merchant in merchants {
        println!("   [{}] {}", merchant.id, merchant.name);
    }

    Ok(())
}

pub fn cmd_merchants_add(db: &Database, user_id: i64, name: &str) -> Result<()> {
    let merchant = db.create_merchant(user_id, name)?;
    println!("✅ Created merchant '{}' (id: {})", merchant.name, merchant.id);
    Ok(())
}
