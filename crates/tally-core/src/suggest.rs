//! Suggestion engine
//!
//! Order: explicit rules → learned patterns → nothing. A rule match always
//! wins over a learned match regardless of confidence. The auto-apply
//! threshold is read from the `ThresholdSource` on every call so it can be
//! tuned while the process is running.

use tracing::debug;

use crate::error::Result;
use crate::learned::LearnedPatternMatcher;
use crate::models::{Suggestion, Transaction};
use crate::rules::RuleMatcher;
use crate::store::{PatternRepository, RuleRepository, ThresholdSource};

/// Whether a suggestion at `confidence` should be applied without asking.
///
/// A threshold above 100 never auto-applies; one below 0 always does.
pub fn should_auto_apply(confidence: i32, threshold: i32) -> bool {
    confidence >= threshold
}

/// Produces category suggestions for transactions
pub struct SuggestionEngine<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    threshold: &'a T,
}

impl<'a, S, T> SuggestionEngine<'a, S, T>
where
    S: RuleRepository + PatternRepository + ?Sized,
    T: ThresholdSource + ?Sized,
{
    pub fn new(store: &'a S, threshold: &'a T) -> Self {
        Self { store, threshold }
    }

    /// Suggest a category for a transaction
    pub fn suggest(&self, transaction: &Transaction) -> Result<Suggestion> {
        let user_id = match transaction.user_id {
            Some(id) => id,
            None => return Ok(Suggestion::empty()),
        };

        self.suggest_for_description(user_id, &transaction.description)
    }

    /// Suggest a category for a bare description
    pub fn suggest_for_description(&self, user_id: i64, description: &str) -> Result<Suggestion> {
        if description.trim().is_empty() {
            return Ok(Suggestion::empty());
        }

        let from_rule = RuleMatcher::new(self.store).match_description(user_id, description)?;
        if !from_rule.is_empty() {
            return self.stamp(from_rule);
        }

        let from_learned =
            LearnedPatternMatcher::new(self.store).match_description(user_id, description)?;
        if !from_learned.is_empty() {
            return self.stamp(from_learned);
        }

        debug!("No suggestion for '{}'", description);
        Ok(Suggestion::empty())
    }

    fn stamp(&self, mut suggestion: Suggestion) -> Result<Suggestion> {
        let threshold = self.threshold.auto_apply_threshold()?;
        suggestion.auto_apply = should_auto_apply(suggestion.confidence, threshold);
        Ok(suggestion)
    }
}
