//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, date parsing)
//! - `categories` - Category list/add
//! - `transactions` - Transaction list/add
//! - `rules` - Rule management, rule testing and overlap detection
//! - `suggest` - Suggestions and corrections
//! - `patterns` - Learned pattern maintenance and statistics
//! - `coverage` - Coverage dry-runs
//! - `threshold` - Auto-apply threshold

pub mod categories;
pub mod core;
pub mod coverage;
pub mod patterns;
pub mod rules;
pub mod suggest;
pub mod threshold;
pub mod transactions;

// Re-export command functions for main.rs
pub use categories::*;
pub use core::*;
pub use coverage::*;
pub use patterns::*;
pub use rules::*;
pub use suggest::*;
pub use threshold::*;
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
