//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SpendSense - Import bank statements and see where the money goes
#[derive(Parser)]
#[command(name = "spendsense")]
#[command(about = "Self-hosted expense tracker for Indian bank and UPI statements", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendsense.db", global = true)]
    pub db: PathBuf,

    /// User whose data to read and write (created on first use)
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    /// Categorization rules file
    ///
    /// Defaults to ~/.local/share/spendsense/config/rules.toml if it exists,
    /// otherwise the built-in rules.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and the user
    Init {
        /// Create the default category set for the user
        #[arg(long)]
        seed_categories: bool,
    },

    /// Import transactions from a statement CSV
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Account the statement belongs to (not needed for Paytm exports)
        #[arg(short, long)]
        account: Option<String>,

        /// Statement format: hdfc, icici, sbi, kotak, paytm (auto-detected if not specified)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Manage merchants
    Merchants {
        #[command(subcommand)]
        action: Option<MerchantsAction>,
    },

    /// Manage monthly budget goals
    Goals {
        #[command(subcommand)]
        action: Option<GoalsAction>,
    },

    /// Manage tags
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// Manage transactions (list, add, categorize, delete)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// List open alerts
    Alerts {
        /// Include acknowledged alerts
        #[arg(long)]
        all: bool,

        #[command(subcommand)]
        action: Option<AlertsAction>,
    },

    /// Show how a description would be categorized, without saving anything
    Resolve {
        /// Transaction description, e.g. "UPI-ZOMATO-/food/"
        description: String,

        /// Stop after the remark step, like manual entry does by default
        #[arg(long)]
        remark_only: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts
    List,

    /// Add an account
    Add {
        /// Account name (Paytm rows are matched against it)
        name: String,

        /// Statement provider, e.g. hdfc or paytm
        #[arg(long)]
        provider: String,

        /// Account type: savings, current, credit, wallet
        #[arg(long = "type", default_value = "savings")]
        account_type: String,

        /// Account number, for display only
        #[arg(long)]
        number: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,

    /// Add a category
    Add {
        name: String,

        /// Mark as an income category
        #[arg(long)]
        income: bool,

        /// Icon shown next to the name
        #[arg(long)]
        icon: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MerchantsAction {
    /// List merchants
    List,

    /// Add a merchant
    Add { name: String },
}

#[derive(Subcommand)]
pub enum GoalsAction {
    /// List goals with this month's spending
    List,

    /// Add a monthly budget goal
    Add {
        name: String,

        /// Category the goal tracks
        #[arg(long)]
        category: String,

        /// Monthly spending target
        #[arg(long)]
        target: f64,

        /// Percentages of the target that raise an alert
        #[arg(long, value_delimiter = ',', default_value = "50,80,100")]
        thresholds: Vec<f64>,
    },

    /// Delete a goal (its alerts go with it)
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// List tags
    List,

    /// Add a tag
    Add { name: String },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Add a transaction by hand
    Add {
        /// Account name
        #[arg(long)]
        account: String,

        /// Date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
        #[arg(long)]
        date: String,

        /// Description; a /remark/ picks the category
        #[arg(long)]
        description: String,

        /// Amount (positive)
        #[arg(long)]
        amount: f64,

        /// Money in rather than out
        #[arg(long)]
        credit: bool,

        /// Category name (inferred from the description if omitted)
        #[arg(long)]
        category: Option<String>,

        /// UPI reference number
        #[arg(long)]
        upi_ref: Option<String>,

        /// Comma-separated tag names
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Set a transaction's category, or re-infer it when no category is given
    Categorize {
        id: i64,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a transaction
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum AlertsAction {
    /// Acknowledge an alert
    Ack { id: i64 },
}
