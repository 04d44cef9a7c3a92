//! SpendSense CLI - Expense tracker for bank and UPI statements
//!
//! Usage:
//!   spendsense init --seed-categories            Initialize database and user
//!   spendsense import --file CSV --account NAME  Import a statement (auto-detects format)
//!   spendsense resolve "UPI-ZOMATO-/food/"       Show how a description is categorized
//!   spendsense alerts                            List open alerts

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use spendsense_core::FallbackChain;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    if let Commands::Init { seed_categories } = cli.command {
        return commands::cmd_init(&cli.db, &cli.user, seed_categories);
    }

    let db = commands::open_db(&cli.db)?;
    let user_id = commands::current_user(&db, &cli.user)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Import {
            file,
            account,
            provider,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_import(
                &db,
                user_id,
                &config,
                &file,
                account.as_deref(),
                provider.as_deref(),
            )
            .map(|_| ())
        }
        Commands::Accounts { action } => match action {
            None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db, user_id),
            Some(AccountsAction::Add {
                name,
                provider,
                account_type,
                number,
            }) => commands::cmd_accounts_add(
                &db,
                user_id,
                &name,
                &provider,
                &account_type,
                number.as_deref(),
            ),
        },
        Commands::Categories { action } => match action {
            None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db, user_id),
            Some(CategoriesAction::Add { name, income, icon }) => {
                commands::cmd_categories_add(&db, user_id, &name, income, icon.as_deref())
            }
        },
        Commands::Merchants { action } => match action {
            None | Some(MerchantsAction::List) => commands::cmd_merchants_list(&db, user_id),
            Some(MerchantsAction::Add { name }) => commands::cmd_merchants_add(&db, user_id, &name),
        },
        Commands::Goals { action } => match action {
            None | Some(GoalsAction::List) => commands::cmd_goals_list(&db, user_id),
            Some(GoalsAction::Add {
                name,
                category,
                target,
                thresholds,
            }) => commands::cmd_goals_add(&db, user_id, &name, &category, target, &thresholds),
            Some(GoalsAction::Delete { id }) => commands::cmd_goals_delete(&db, user_id, id),
        },
        Commands::Tags { action } => match action {
            None | Some(TagsAction::List) => commands::cmd_tags_list(&db, user_id),
            Some(TagsAction::Add { name }) => commands::cmd_tags_add(&db, user_id, &name),
        },
        Commands::Transactions { action } => {
            let config = commands::load_config(cli.config.as_deref())?;
            match action {
                None => commands::cmd_transactions_list(&db, user_id, 20),
                Some(TransactionsAction::List { limit }) => {
                    commands::cmd_transactions_list(&db, user_id, limit)
                }
                Some(TransactionsAction::Add {
                    account,
                    date,
                    description,
                    amount,
                    credit,
                    category,
                    upi_ref,
                    tags,
                }) => commands::cmd_transactions_add(
                    &db,
                    user_id,
                    &config,
                    commands::NewTransactionArgs {
                        account: &account,
                        date: &date,
                        description: &description,
                        amount,
                        credit,
                        category: category.as_deref(),
                        upi_ref,
                        tags: &tags,
                    },
                ),
                Some(TransactionsAction::Categorize { id, category }) => {
                    commands::cmd_transactions_categorize(
                        &db,
                        user_id,
                        &config,
                        id,
                        category.as_deref(),
                    )
                }
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, user_id, &config, id)
                }
            }
        }
        Commands::Alerts { all, action } => match action {
            None => commands::cmd_alerts_list(&db, user_id, all),
            Some(AlertsAction::Ack { id }) => commands::cmd_alerts_ack(&db, user_id, id),
        },
        Commands::Resolve {
            description,
            remark_only,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let chain = if remark_only {
                FallbackChain::RemarkOnly
            } else {
                FallbackChain::Full
            };
            commands::cmd_resolve(&db, user_id, &config, &description, chain)
        }
    }
}
