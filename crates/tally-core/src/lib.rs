//! Tally Core Library
//!
//! Transaction categorization for the Tally personal finance tool:
//! - Keyword extraction from transaction descriptions
//! - Explicit user rules evaluated in priority order
//! - Keyword patterns learned from user corrections
//! - Suggestion engine with a tunable auto-apply threshold
//! - Pattern maintenance, rule overlap analysis and coverage dry-runs
//! - SQLite (SQLCipher) persistence with connection pooling

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod keywords;
pub mod learned;
pub mod learning;
pub mod maintenance;
pub mod models;
pub mod rules;
pub mod store;
pub mod suggest;

/// In-memory repository for engine tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analysis::{CoverageTester, OverlapAnalyzer};
pub use config::Config;
pub use db::{Database, SettingsThreshold};
pub use error::{Error, Result};
pub use keywords::extract_keywords;
pub use learned::LearnedPatternMatcher;
pub use learning::{parse_correction_type, CorrectionLearner};
pub use maintenance::PatternMaintainer;
pub use rules::RuleMatcher;
pub use store::{
    CorrectionLog, PatternRepository, RuleRepository, RuleWriter, ThresholdSource,
    TransactionSource,
};
pub use suggest::{should_auto_apply, SuggestionEngine};
