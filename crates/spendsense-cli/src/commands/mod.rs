//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, resolve) and shared utilities (open_db, current_user)
//! - `import` - Statement import
//! - `accounts` - Account commands (list, add)
//! - `categories` - Category and merchant commands (list, add)
//! - `goals` - Budget goal commands (list, add, delete)
//! - `tags` - Tag commands (list, add)
//! - `transactions` - Transaction commands (list, add, categorize, delete)
//! - `alerts` - Alert commands (list, ack)

pub mod accounts;
pub mod alerts;
pub mod categories;
pub mod core;
pub mod goals;
pub mod import;
pub mod tags;
pub mod transactions;

// Re-export command functions for main.rs
pub use accounts::*;
pub use alerts::*;
pub use categories::*;
pub use core::*;
pub use goals::*;
pub use import::*;
pub use tags::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
