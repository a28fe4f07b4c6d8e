//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Categorize transactions and learn from your corrections
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Rule and learned-pattern transaction categorizer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (default: ~/.local/share/tally/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// User to act for (overrides the config file)
    #[arg(long, global = true)]
    pub user: Option<i64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Manage transactions
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Suggest a category for a transaction or a bare description
    Suggest {
        /// Transaction ID
        #[arg(required_unless_present = "description", conflicts_with = "description")]
        transaction_id: Option<i64>,

        /// Description to test instead of a stored transaction
        #[arg(short, long)]
        description: Option<String>,

        /// Apply the suggestion when it clears the auto-apply threshold
        #[arg(long)]
        apply: bool,
    },

    /// Correct a transaction's category and learn from it
    Correct {
        /// Transaction ID
        transaction_id: i64,

        /// Correct category ID
        category_id: i64,

        /// Correction type: auto_to_manual, wrong_auto_choice, missing_category,
        /// updated_learned_pattern, confidence_override (inferred if omitted)
        #[arg(long = "type")]
        correction_type: Option<String>,

        /// Confidence of the suggestion being corrected (0-100)
        #[arg(long)]
        confidence: Option<i32>,
    },

    /// Inspect and maintain learned patterns
    Patterns {
        #[command(subcommand)]
        action: Option<PatternsAction>,
    },

    /// Dry-run current rules and patterns against uncategorized transactions
    Coverage {
        /// Start date (YYYY-MM-DD, default: 90 days ago)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, default: today)
        #[arg(long)]
        to: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the auto-apply threshold
    Threshold {
        #[command(subcommand)]
        action: Option<ThresholdAction>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: i64,

        /// Only show uncategorized transactions
        #[arg(long)]
        uncategorized: bool,
    },

    /// Add a transaction
    Add {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Description as it appears on the statement
        description: String,

        /// Amount (negative for spending)
        #[arg(allow_hyphen_values = true)]
        amount: f64,

        /// Category ID
        #[arg(long)]
        category: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List {
        /// Include archived rules
        #[arg(long)]
        all: bool,
    },

    /// Add a new rule
    Add {
        /// Text to look for in transaction descriptions (case-insensitive)
        pattern: String,

        /// Category to assign when the rule matches
        category_id: i64,

        /// Rule priority (lower = checked first)
        #[arg(long, default_value = "100")]
        priority: i32,
    },

    /// Archive a rule (stops matching, kept for history)
    Archive {
        /// Rule ID
        id: i64,
    },

    /// Restore an archived rule
    Unarchive {
        /// Rule ID
        id: i64,
    },

    /// Resume matching with a disabled rule
    Enable {
        /// Rule ID
        id: i64,
    },

    /// Stop matching with a rule without archiving it
    Disable {
        /// Rule ID
        id: i64,
    },

    /// Change one rule's priority (lower is checked first)
    Priority {
        /// Rule ID
        id: i64,

        /// New priority
        #[arg(allow_hyphen_values = true)]
        priority: i32,
    },

    /// Set evaluation order: rules listed first are checked first
    Reorder {
        /// Rule IDs in the desired order
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },

    /// Show which rules match a description
    Test {
        /// Description to test
        description: String,
    },

    /// List rules that shadow each other
    Overlaps,
}

#[derive(Subcommand)]
pub enum PatternsAction {
    /// List learned patterns
    List {
        /// Include disabled patterns
        #[arg(long)]
        all: bool,
    },

    /// Highest-confidence active patterns
    Top {
        /// Number of patterns to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Well-observed patterns that are still low-confidence
    Underperforming {
        /// Confidence below which a pattern counts as underperforming
        #[arg(long, default_value = "70")]
        min_confidence: i32,

        /// Minimum number of observations
        #[arg(long, default_value = "5")]
        min_occurrences: i64,
    },

    /// Disable learned patterns (rows are kept)
    Reset {
        /// Only reset patterns for this category
        #[arg(long)]
        category: Option<i64>,
    },

    /// Lower a pattern's confidence
    Penalize {
        /// Pattern ID
        id: i64,

        /// Confidence to remove
        #[arg(long, default_value = "10")]
        amount: i32,
    },

    /// Turn a learned pattern into an explicit rule
    Promote {
        /// Pattern ID
        id: i64,

        /// Priority for the new rule (lower = checked first)
        #[arg(long, default_value = "100")]
        priority: i32,
    },

    /// Learning statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ThresholdAction {
    /// Show the current threshold
    Get,

    /// Set the threshold (0-100); applies to the next suggestion
    Set {
        /// New threshold
        value: i32,
    },
}
