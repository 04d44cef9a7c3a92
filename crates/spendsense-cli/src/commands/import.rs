//! Statement import command

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use spendsense_core::{
    db::Database,
    parsers::{self, Provider},
    BatchImporter, ImportSummary, PipelineConfig,
};
use tracing::debug;

pub fn cmd_import(
    db: &Database,
    user_id: i64,
    config: &PipelineConfig,
    file: &Path,
    account_name: Option<&str>,
    provider_str: Option<&str>,
) -> Result<ImportSummary> {
    // Read first line for auto-detection
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let mut header_line = String::new();
    BufReader::new(csv_file)
        .read_line(&mut header_line)
        .with_context(|| "Failed to read CSV header")?;

    let provider: Provider = if let Some(provider_str) = provider_str {
        provider_str.parse()?
    } else {
        let detected = parsers::detect_provider(&header_line).ok_or_else(|| {
            anyhow::anyhow!(
                "Could not auto-detect statement format from CSV header.\n\
                 Specify --provider with one of: hdfc, icici, sbi, kotak, paytm"
            )
        })?;
        debug!(provider = %detected, "Detected statement format");
        detected
    };

    println!("📥 Importing {} statement from {}...", provider, file.display());

    // Re-open file to parse from beginning (including header)
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    let parsed = match provider.layout() {
        Some(layout) => {
            let name = account_name.ok_or_else(|| {
                anyhow::anyhow!("--account is required for {} statements", provider)
            })?;
            let account = db
                .find_account_by_name(user_id, name)?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "Account not found: {}. Add it with 'spendsense accounts add'",
                        name
                    )
                })?;
            parsers::parse_statement(csv_file, account.id, &layout)?
        }
        None => {
            let accounts = db.account_map(user_id)?;
            if accounts.is_empty() {
                anyhow::bail!("No accounts to match Paytm rows against. Add one with 'spendsense accounts add'");
            }
            parsers::parse_paytm(csv_file, &accounts)?
        }
    };

    println!("   Found {} transactions", parsed.transactions.len());
    if !parsed.skipped.is_empty() {
        println!("   ⚠️  Skipped {} unreadable rows:", parsed.skipped.len());
        for row in &parsed.skipped {
            println!("      line {}: {}", row.line, row.reason);
        }
    }

    let importer = BatchImporter::new(db, config)?;
    let summary = importer.import(user_id, parsed.transactions)?;

    println!("✅ Import complete!");
    println!("   Imported: {}", summary.inserted);
    println!("   Skipped (duplicates): {}", summary.duplicates);
    if summary.rejected > 0 {
        println!("   Rejected (unknown account): {}", summary.rejected);
    }

    let b = &summary.breakdown;
    if summary.inserted > 0 {
        println!();
        println!("🏷️  Categorized:");
        println!("   - By remark: {}", b.by_remark);
        println!("   - By transfer keyword: {}", b.by_transfer);
        println!("   - By merchant rule: {}", b.by_merchant_rule);
        println!("   - By default: {}", b.by_default);
        if b.unresolved > 0 {
            println!("   - Uncategorized: {}", b.unresolved);
        }
    }

    if !summary.new_categories.is_empty() {
        println!();
        println!(
            "💡 Remarks named categories you don't have: {}",
            summary.new_categories.join(", ")
        );
        println!("   Add them with 'spendsense categories add <name>'");
    }
    if summary.budget_alerts > 0 {
        println!();
        println!(
            "⚠️  {} budget alerts raised. Run 'spendsense alerts' to see details.",
            summary.budget_alerts
        );
    }

    Ok(summary)
}
