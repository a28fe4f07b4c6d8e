//! Repository interfaces the categorization engine reads and writes through
//!
//! The engine never talks to SQLite directly. `Database` implements every trait
//! here; `test_utils::MemoryStore` implements them in memory for unit tests.
//! Nothing is cached across calls, so rules and patterns may change between
//! any two suggestions.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{
    AutoCategoryRule, CorrectionType, LearnedCategoryPattern, NewCorrection, PatternUpsert,
    Transaction,
};

/// Read access to transactions and category names
pub trait TransactionSource {
    /// Get a transaction by id
    fn transaction(&self, id: i64) -> Result<Option<Transaction>>;

    /// Uncategorized transactions for a user dated within `[from, to]`
    fn uncategorized_transactions(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>>;

    /// Display name for a category
    fn category_name(&self, category_id: i64) -> Result<Option<String>>;
}

/// Read access to a user's explicit rules
pub trait RuleRepository {
    /// Active, non-archived rules ordered by priority ascending, then id
    fn active_rules_for(&self, user_id: i64) -> Result<Vec<AutoCategoryRule>>;
}

/// Rule creation for flows that turn learned knowledge into explicit rules
pub trait RuleWriter {
    /// Create an active rule and return its id
    fn create_rule(
        &self,
        user_id: i64,
        pattern: &str,
        category_id: i64,
        priority: i32,
    ) -> Result<i64>;
}

/// Read/write access to learned patterns; the engine owns this write path
pub trait PatternRepository {
    /// Active patterns at or above `min_confidence`, ordered by category id,
    /// then confidence descending, then id
    fn matchable_patterns_for(
        &self,
        user_id: i64,
        min_confidence: i32,
    ) -> Result<Vec<LearnedCategoryPattern>>;

    /// Get a pattern by id
    fn pattern(&self, pattern_id: i64) -> Result<Option<LearnedCategoryPattern>>;

    /// Every pattern for a user, active or not
    fn patterns_for(&self, user_id: i64) -> Result<Vec<LearnedCategoryPattern>>;

    /// Atomically create or reinforce the `(user, keyword, category)` pattern
    fn upsert_pattern_observation(
        &self,
        user_id: i64,
        keyword: &str,
        category_id: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<PatternUpsert>;

    /// Lower a pattern's confidence and recompute its active flag
    fn penalize_pattern(&self, pattern_id: i64, amount: i32)
        -> Result<Option<LearnedCategoryPattern>>;

    /// Disable a user's active patterns, optionally only for one category.
    /// Returns the number of rows disabled.
    fn deactivate_patterns(&self, user_id: i64, category_id: Option<i64>) -> Result<usize>;
}

/// Append-only correction audit log
pub trait CorrectionLog {
    fn append_correction(&self, correction: &NewCorrection) -> Result<i64>;

    /// Correction counts per type for a user (types with no corrections may be omitted)
    fn correction_counts_by_type(&self, user_id: i64) -> Result<Vec<(CorrectionType, i64)>>;
}

/// Where the auto-apply threshold comes from. Read on every suggestion.
pub trait ThresholdSource {
    fn auto_apply_threshold(&self) -> Result<i32>;
}

impl ThresholdSource for i32 {
    fn auto_apply_threshold(&self) -> Result<i32> {
        Ok(*self)
    }
}
