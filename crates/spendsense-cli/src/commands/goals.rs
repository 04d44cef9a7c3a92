//! Budget goal command implementations

use anyhow::Result;
use chrono::Local;
use spendsense_core::{alerts::month_bounds, db::Database};

pub fn cmd_goals_list(db: &Database, user_id: i64) -> Result<()> {
    let goals = db.list_goals(user_id)?;

    if goals.is_empty() {
        println!("No goals yet. Add one with:");
        println!("  spendsense goals add \"Eating out\" --category Food --target 5000");
        return Ok(());
    }

    let categories = db.get_categories(user_id)?;
    let (from, to) = month_bounds(Local::now().date_naive())?;

    println!();
    println!("🎯 Goals (this month)");
    println!("   ─────────────────────────────────────────────────────────────");

    for goal in goals {
        let category = categories
            .iter()
            .find(|c| c.id == goal.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        let spent = db.get_category_spend(user_id, goal.category_id, from, to)?;
        let pct = spent / goal.target_amount * 100.0;
        let thresholds: Vec<String> = goal.thresholds.iter().map(|t| format!("{}%", t)).collect();

        println!(
            "   [{}] {:20} │ {:15} │ ₹{:.2} / ₹{:.2} ({:.0}%) │ alerts at {}",
            goal.id,
            super::truncate(&goal.name, 20),
            super::truncate(category, 15),
            spent,
            goal.target_amount,
            pct,
            thresholds.join(", ")
        );
    }

    Ok(())
}

pub fn cmd_goals_add(
    db: &Database,
    user_id: i64,
    name: &str,
    category_name: &str,
    target: f64,
    thresholds: &[f64],
) -> Result<()> {
    let category = db
        .find_category_by_name(user_id, category_name)?
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", category_name))?;

    let goal = db.create_goal(user_id, name, category.id, target, thresholds)?;
    println!(
        "✅ Created goal '{}' for {} (id: {}, target ₹{:.2})",
        goal.name, category.name, goal.id, goal.target_amount
    );

    Ok(())
}

pub fn cmd_goals_delete(db: &Database, user_id: i64, id: i64) -> Result<()> {
    if !db.delete_goal(user_id, id)? {
        anyhow::bail!("Goal {} not found", id);
    }
    println!("✅ Deleted goal {}", id);
    Ok(())
}
