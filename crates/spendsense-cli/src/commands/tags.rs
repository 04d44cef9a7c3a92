//! Tag command implementations

use anyhow::Result;
use spendsense_core::db::Database;

pub fn cmd_tags_list(db: &Database, user_id: i64) -> Result<()> {
    let tags = db.list_tags(user_id)?;

    if tags.is_empty() {
        println!("No tags yet. Add one with 'spendsense tags add <name>'.");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags");
    println!("   ─────────────────────────────────────────────────────────────");
    for tag in tags {
        println!("   • {} (id: {})", tag.name, tag.id);
    }

    Ok(())
}

pub fn cmd_tags_add(db: &Database, user_id: i64, name: &str) -> Result<()> {
    let tag = db.create_tag(user_id, name)?;
    println!("✅ Created tag '{}' (id: {})", tag.name, tag.id);
    Ok(())
}
