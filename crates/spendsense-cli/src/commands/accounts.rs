//! Account command implementations

use anyhow::Result;
use spendsense_core::{db::Database, models::AccountType};

pub fn cmd_accounts_list(db: &Database, user_id: i64) -> Result<()> {
    let accounts = db.list_accounts(user_id)?;

    if accounts.is_empty() {
        println!("No accounts yet. Add one with:");
        println!("  spendsense accounts add \"HDFC Savings\" --provider hdfc");
        return Ok(());
    }

    println!();
    println!("🏦 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");

    for account in accounts {
        let number = account
            .account_number
            .as_deref()
            .map(|n| format!(" ({})", n))
            .unwrap_or_default();
        println!(
            "   [{}] {}{} │ {} │ {}",
            account.id, account.name, number, account.provider, account.account_type
        );
    }

    Ok(())
}

pub fn cmd_accounts_add(
    db: &Database,
    user_id: i64,
    name: &str,
    provider: &str,
    account_type: &str,
    number: Option<&str>,
) -> Result<()> {
    let account_type: AccountType = account_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let account = db.create_account(user_id, name, account_type, provider, number)?;
    println!("✅ Created account '{}' (id: {})", account.name, account.id);

    Ok(())
}
