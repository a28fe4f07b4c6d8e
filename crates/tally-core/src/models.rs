//! Domain models for Tally

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Confidence every learned pattern starts from before occurrences are added
pub const BASE_CONFIDENCE: i32 = 50;

/// Confidence gained per observed occurrence
pub const CONFIDENCE_STEP: i32 = 5;

/// Upper bound for any confidence score
pub const MAX_CONFIDENCE: i32 = 100;

/// Confidence reported for explicit rule matches
pub const RULE_CONFIDENCE: i32 = 100;

/// A learned pattern stays active only while its confidence is at least this
pub const PATTERN_SURVIVAL_CONFIDENCE: i32 = 30;

/// A learned pattern may suggest a category only at or above this confidence
pub const MIN_MATCH_CONFIDENCE: i32 = 75;

/// Default confidence removed when a learned suggestion is rejected
pub const DEFAULT_PENALTY: i32 = 10;

/// Default confidence at or above which a suggestion is applied without asking
pub const DEFAULT_AUTO_APPLY_THRESHOLD: i32 = 90;

/// Confidence for a pattern observed `occurrence_count` times.
///
/// Starts at 55 for the first observation and saturates at 100 after 10.
pub fn reinforced_confidence(occurrence_count: i64) -> i32 {
    let raw = i64::from(BASE_CONFIDENCE) + occurrence_count.max(0) * i64::from(CONFIDENCE_STEP);
    raw.min(i64::from(MAX_CONFIDENCE)) as i32
}

/// A spending/income category owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A financial transaction as seen by the categorization engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Owner of the transaction; transactions without an owner are never categorized
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build an unsaved transaction for previewing a description
    pub fn preview(user_id: i64, description: &str) -> Self {
        Self {
            id: 0,
            user_id: Some(user_id),
            date: Utc::now().date_naive(),
            description: description.to_string(),
            amount: 0.0,
            category_id: None,
            created_at: Utc::now(),
        }
    }
}

/// New transaction for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
}

/// A user-authored pattern rule mapping descriptions to a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCategoryRule {
    pub id: i64,
    pub user_id: i64,
    /// Case-insensitive substring matched against descriptions
    pub pattern: String,
    pub category_id: i64,
    /// Lower values are evaluated first
    pub priority: i32,
    pub active: bool,
    /// Archived rules are paused rather than deleted
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl AutoCategoryRule {
    /// Whether the rule's pattern occurs in the description (case-insensitive)
    pub fn matches(&self, description: &str) -> bool {
        let pattern = self.pattern.trim().to_lowercase();
        !pattern.is_empty() && description.to_lowercase().contains(&pattern)
    }
}

/// A keyword→category association learned from user corrections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedCategoryPattern {
    pub id: i64,
    pub user_id: i64,
    /// Always lowercase
    pub keyword: String,
    pub category_id: i64,
    /// 0–100
    pub confidence: i32,
    pub occurrence_count: i64,
    pub active: bool,
    pub first_learned_at: DateTime<Utc>,
    pub last_matched_at: DateTime<Utc>,
}

impl LearnedCategoryPattern {
    /// Lower confidence by `amount` (never below zero) and recompute the active flag
    pub fn apply_penalty(&mut self, amount: i32) {
        self.confidence = (self.confidence - amount).max(0);
        self.active = self.confidence >= PATTERN_SURVIVAL_CONFIDENCE;
    }

    /// Whether the pattern is allowed to produce suggestions
    pub fn can_suggest(&self) -> bool {
        self.active && self.confidence >= MIN_MATCH_CONFIDENCE
    }

    /// Bidirectional substring test against an extracted keyword
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let own = self.keyword.to_lowercase();
        let other = keyword.to_lowercase();
        other.contains(&own) || own.contains(&other)
    }
}

/// Whether an upsert created a new row or reinforced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Result of recording one keyword observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternUpsert {
    pub pattern: LearnedCategoryPattern,
    pub outcome: UpsertOutcome,
}

/// Why a user corrected a transaction's category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    /// User replaced an automatically applied category
    AutoToManual,
    /// The engine suggested the wrong category
    WrongAutoChoice,
    /// The engine had no suggestion at all
    MissingCategory,
    /// User adjusted a learned pattern directly
    UpdatedLearnedPattern,
    /// User overrode a suggestion despite its confidence
    ConfidenceOverride,
}

impl CorrectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoToManual => "auto_to_manual",
            Self::WrongAutoChoice => "wrong_auto_choice",
            Self::MissingCategory => "missing_category",
            Self::UpdatedLearnedPattern => "updated_learned_pattern",
            Self::ConfidenceOverride => "confidence_override",
        }
    }

    /// Get all correction types
    pub fn all() -> &'static [CorrectionType] {
        &[
            Self::AutoToManual,
            Self::WrongAutoChoice,
            Self::MissingCategory,
            Self::UpdatedLearnedPattern,
            Self::ConfidenceOverride,
        ]
    }
}

impl std::str::FromStr for CorrectionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto_to_manual" => Ok(Self::AutoToManual),
            "wrong_auto_choice" => Ok(Self::WrongAutoChoice),
            "missing_category" => Ok(Self::MissingCategory),
            "updated_learned_pattern" => Ok(Self::UpdatedLearnedPattern),
            "confidence_override" => Ok(Self::ConfidenceOverride),
            _ => Err(format!("Unknown correction type: {}", s)),
        }
    }
}

impl std::fmt::Display for CorrectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable audit record of a user correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCategoryCorrection {
    pub id: i64,
    pub user_id: i64,
    pub transaction_id: i64,
    pub original_category_id: Option<i64>,
    pub corrected_category_id: i64,
    /// Raw description at the time of correction
    pub description: String,
    pub correction_type: CorrectionType,
    pub confidence_at_correction: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// New correction for the append-only log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCorrection {
    pub user_id: i64,
    pub transaction_id: i64,
    pub original_category_id: Option<i64>,
    pub corrected_category_id: i64,
    pub description: String,
    pub correction_type: CorrectionType,
    pub confidence_at_correction: Option<i32>,
}

/// Result of learning from one correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub correction_id: i64,
    pub upserts: Vec<PatternUpsert>,
}

impl CorrectionOutcome {
    /// Number of patterns created by this correction
    pub fn patterns_created(&self) -> usize {
        self.upserts
            .iter()
            .filter(|u| u.outcome == UpsertOutcome::Inserted)
            .count()
    }

    /// Number of existing patterns reinforced by this correction
    pub fn patterns_reinforced(&self) -> usize {
        self.upserts.len() - self.patterns_created()
    }
}

/// Where a suggestion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Matched by an explicit user rule
    RuleExact,
    /// Matched by a learned keyword pattern
    LearnedKeyword,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleExact => "rule_exact",
            Self::LearnedKeyword => "learned_keyword",
        }
    }
}

impl std::str::FromStr for SuggestionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule_exact" => Ok(Self::RuleExact),
            "learned_keyword" => Ok(Self::LearnedKeyword),
            _ => Err(format!("Unknown suggestion source: {}", s)),
        }
    }
}

impl std::fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proposed category for a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category_id: Option<i64>,
    /// 0–100
    pub confidence: i32,
    /// Rule pattern or learned keywords that produced the suggestion
    pub matched_keywords: Vec<String>,
    pub source: Option<SuggestionSource>,
    pub auto_apply: bool,
}

impl Suggestion {
    /// No category, zero confidence, no source, never auto-applied
    pub fn empty() -> Self {
        Self {
            category_id: None,
            confidence: 0,
            matched_keywords: Vec::new(),
            source: None,
            auto_apply: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
    }
}

impl Default for Suggestion {
    fn default() -> Self {
        Self::empty()
    }
}

/// What the user did with a logged suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionOutcome {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for SuggestionOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown suggestion outcome: {}", s)),
        }
    }
}

/// Persisted record of a suggestion shown for a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionLog {
    pub id: i64,
    pub user_id: i64,
    pub transaction_id: i64,
    pub suggested_category_id: Option<i64>,
    pub confidence: i32,
    pub matched_keywords: Vec<String>,
    pub source: Option<SuggestionSource>,
    pub auto_applied: bool,
    pub outcome: SuggestionOutcome,
    pub created_at: DateTime<Utc>,
}

/// New suggestion log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSuggestionLog {
    pub user_id: i64,
    pub transaction_id: i64,
    pub suggested_category_id: Option<i64>,
    pub confidence: i32,
    pub matched_keywords: Vec<String>,
    pub source: Option<SuggestionSource>,
    pub auto_applied: bool,
}

impl SuggestionLog {
    /// Capture the fields of a suggestion for the analytics log
    pub fn from_suggestion(
        user_id: i64,
        transaction_id: i64,
        suggestion: &Suggestion,
    ) -> NewSuggestionLog {
        NewSuggestionLog {
            user_id,
            transaction_id,
            suggested_category_id: suggestion.category_id,
            confidence: suggestion.confidence,
            matched_keywords: suggestion.matched_keywords.clone(),
            source: suggestion.source,
            auto_applied: suggestion.auto_apply,
        }
    }
}

/// Correction count for one correction type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionTypeCount {
    pub correction_type: CorrectionType,
    pub count: i64,
}

/// Aggregate view of a user's learned patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternStats {
    pub total_patterns: i64,
    pub active_patterns: i64,
    pub disabled_patterns: i64,
    /// Across all patterns, rounded to 2 decimals
    pub average_confidence: f64,
    pub max_confidence: i32,
    /// Among active patterns only
    pub min_active_confidence: i32,
    pub total_corrections: i64,
    pub corrections_by_type: Vec<CorrectionTypeCount>,
    /// Patterns first learned within the last 7 days
    pub patterns_learned_this_week: i64,
    /// Patterns per day over the last week, rounded to 2 decimals
    pub learning_velocity: f64,
}

impl PatternStats {
    /// Statistics for a user with no patterns and no corrections
    pub fn empty() -> Self {
        Self {
            total_patterns: 0,
            active_patterns: 0,
            disabled_patterns: 0,
            average_confidence: 0.0,
            max_confidence: 0,
            min_active_confidence: 0,
            total_corrections: 0,
            corrections_by_type: CorrectionType::all()
                .iter()
                .map(|t| CorrectionTypeCount {
                    correction_type: *t,
                    count: 0,
                })
                .collect(),
            patterns_learned_this_week: 0,
            learning_velocity: 0.0,
        }
    }
}

/// Warning attached to every overlapping rule pair
pub const OVERLAP_WARNING: &str =
    "Rules overlap: one pattern contains the other, so only the higher-priority rule will match";

/// Two rules whose patterns contain one another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOverlap {
    pub first_rule_id: i64,
    pub first_pattern: String,
    pub first_priority: i32,
    pub second_rule_id: i64,
    pub second_pattern: String,
    pub second_priority: i32,
    pub message: String,
}

/// Why an uncategorized transaction would stay uncategorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UncoveredReason {
    MissingDescription,
    NoMatchingPattern,
}

impl UncoveredReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDescription => "Missing description",
            Self::NoMatchingPattern => "No matching pattern",
        }
    }
}

impl std::fmt::Display for UncoveredReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coverage for a single category in a coverage run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCoverage {
    pub category_id: i64,
    pub category_name: Option<String>,
    pub count: i64,
    /// Source of the first suggestion seen for this category
    pub source: SuggestionSource,
}

/// What the current rules and patterns would categorize in a backlog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total: i64,
    pub would_be_categorized: i64,
    /// Truncated integer percentage, 0 when there is nothing to cover
    pub coverage_percentage: i64,
    pub by_category: Vec<CategoryCoverage>,
    pub uncovered_reasons: BTreeMap<String, i64>,
}

impl CoverageReport {
    /// Report for an empty backlog
    pub fn empty() -> Self {
        Self {
            total: 0,
            would_be_categorized: 0,
            coverage_percentage: 0,
            by_category: Vec::new(),
            uncovered_reasons: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(confidence: i32) -> LearnedCategoryPattern {
        LearnedCategoryPattern {
            id: 1,
            user_id: 1,
            keyword: "amazon".to_string(),
            category_id: 1,
            confidence,
            occurrence_count: 3,
            active: true,
            first_learned_at: Utc::now(),
            last_matched_at: Utc::now(),
        }
    }

    #[test]
    fn test_reinforced_confidence() {
        assert_eq!(reinforced_confidence(1), 55);
        assert_eq!(reinforced_confidence(2), 60);
        assert_eq!(reinforced_confidence(10), 100);
        assert_eq!(reinforced_confidence(25), 100);
        assert_eq!(reinforced_confidence(0), 50);
    }

    #[test]
    fn test_apply_penalty_floors_at_zero() {
        let mut p = pattern(5);
        p.apply_penalty(10);
        assert_eq!(p.confidence, 0);
        assert!(!p.active);
    }

    #[test]
    fn test_apply_penalty_survival_boundary() {
        let mut p = pattern(40);
        p.apply_penalty(10);
        assert_eq!(p.confidence, 30);
        assert!(p.active);

        p.apply_penalty(1);
        assert_eq!(p.confidence, 29);
        assert!(!p.active);
    }

    #[test]
    fn test_preview_transaction_is_unsaved_and_owned() {
        let tx = Transaction::preview(7, "PHILZ COFFEE");
        assert_eq!(tx.id, 0);
        assert_eq!(tx.user_id, Some(7));
        assert_eq!(tx.description, "PHILZ COFFEE");
        assert_eq!(tx.category_id, None);
    }

    #[test]
    fn test_can_suggest_requires_match_threshold() {
        assert!(pattern(75).can_suggest());
        assert!(!pattern(74).can_suggest());

        let mut inactive = pattern(90);
        inactive.active = false;
        assert!(!inactive.can_suggest());
    }

    #[test]
    fn test_matches_keyword_is_bidirectional() {
        let p = pattern(80);
        assert!(p.matches_keyword("amazon"));
        assert!(p.matches_keyword("amazoncom"));
        assert!(p.matches_keyword("AMAZ"));
        assert!(!p.matches_keyword("walmart"));
    }

    #[test]
    fn test_rule_matches_case_insensitive() {
        let rule = AutoCategoryRule {
            id: 1,
            user_id: 1,
            pattern: "Whole Foods".to_string(),
            category_id: 2,
            priority: 10,
            active: true,
            archived: false,
            created_at: Utc::now(),
        };
        assert!(rule.matches("WHOLE FOODS MARKET #123"));
        assert!(!rule.matches("TRADER JOES"));
    }

    #[test]
    fn test_blank_rule_never_matches() {
        let rule = AutoCategoryRule {
            id: 1,
            user_id: 1,
            pattern: "   ".to_string(),
            category_id: 2,
            priority: 10,
            active: true,
            archived: false,
            created_at: Utc::now(),
        };
        assert!(!rule.matches("ANYTHING"));
    }

    #[test]
    fn test_correction_type_parse() {
        assert_eq!(
            "wrong_auto_choice".parse::<CorrectionType>().unwrap(),
            CorrectionType::WrongAutoChoice
        );
        assert_eq!(
            "CONFIDENCE_OVERRIDE".parse::<CorrectionType>().unwrap(),
            CorrectionType::ConfidenceOverride
        );
        assert!("bogus".parse::<CorrectionType>().is_err());
        for t in CorrectionType::all() {
            assert_eq!(t.as_str().parse::<CorrectionType>().unwrap(), *t);
        }
    }

    #[test]
    fn test_empty_suggestion() {
        let s = Suggestion::empty();
        assert!(s.is_empty());
        assert_eq!(s.confidence, 0);
        assert!(!s.auto_apply);
        assert!(s.source.is_none());
    }

    #[test]
    fn test_suggestion_serializes_source_tag() {
        let s = Suggestion {
            category_id: Some(3),
            confidence: 100,
            matched_keywords: vec!["netflix".to_string()],
            source: Some(SuggestionSource::RuleExact),
            auto_apply: true,
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["source"], "rule_exact");
    }
}
