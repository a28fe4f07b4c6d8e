//! Explicit rule matching
//!
//! Rules are evaluated in ascending priority order (ties by id) and the first
//! rule whose pattern occurs in the description wins. A broader rule with a
//! lower priority number beats a more specific rule with a higher one; the
//! order is the contract, not the specificity.

use tracing::debug;

use crate::error::Result;
use crate::models::{AutoCategoryRule, Suggestion, SuggestionSource, RULE_CONFIDENCE};
use crate::store::RuleRepository;

/// Evaluates a user's active rules against descriptions
pub struct RuleMatcher<'a, R: RuleRepository + ?Sized> {
    rules: &'a R,
}

impl<'a, R: RuleRepository + ?Sized> RuleMatcher<'a, R> {
    pub fn new(rules: &'a R) -> Self {
        Self { rules }
    }

    /// Suggest a category from the first matching rule, or an empty suggestion
    pub fn match_description(&self, user_id: i64, description: &str) -> Result<Suggestion> {
        let rules = self.rules.active_rules_for(user_id)?;

        match rules.iter().find(|rule| rule.matches(description)) {
            Some(rule) => {
                debug!(
                    "Rule #{} ('{}', priority {}) matched '{}'",
                    rule.id, rule.pattern, rule.priority, description
                );
                Ok(Suggestion {
                    category_id: Some(rule.category_id),
                    confidence: RULE_CONFIDENCE,
                    matched_keywords: vec![rule.pattern.clone()],
                    source: Some(SuggestionSource::RuleExact),
                    auto_apply: false,
                })
            }
            None => Ok(Suggestion::empty()),
        }
    }

    /// Every rule that matches the description, in evaluation order
    pub fn matching_rules(&self, user_id: i64, description: &str) -> Result<Vec<AutoCategoryRule>> {
        Ok(self
            .rules
            .active_rules_for(user_id)?
            .into_iter()
            .filter(|rule| rule.matches(description))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[test]
    fn test_first_rule_by_priority_wins() {
        let store = MemoryStore::new();
        store.add_rule(1, "whole foods", 10, 10);
        store.add_rule(1, "foods", 20, 20);

        let matcher = RuleMatcher::new(&store);
        let suggestion = matcher.match_description(1, "Whole Foods Store").unwrap();

        assert_eq!(suggestion.category_id, Some(10));
        assert_eq!(suggestion.confidence, 100);
        assert_eq!(suggestion.matched_keywords, vec!["whole foods".to_string()]);
        assert_eq!(suggestion.source, Some(SuggestionSource::RuleExact));
    }

    #[test]
    fn test_broader_rule_with_lower_priority_number_wins() {
        let store = MemoryStore::new();
        store.add_rule(1, "uber", 7, 5);
        store.add_rule(1, "uber eats", 8, 50);

        let matcher = RuleMatcher::new(&store);
        let suggestion = matcher.match_description(1, "UBER EATS DELIVERY").unwrap();
        assert_eq!(suggestion.category_id, Some(7));
    }

    #[test]
    fn test_priority_tie_uses_storage_order() {
        let store = MemoryStore::new();
        store.add_rule(1, "coffee", 3, 10);
        store.add_rule(1, "shop", 4, 10);

        let matcher = RuleMatcher::new(&store);
        let suggestion = matcher.match_description(1, "COFFEE SHOP").unwrap();
        assert_eq!(suggestion.category_id, Some(3));
    }

    #[test]
    fn test_no_match_is_empty() {
        let store = MemoryStore::new();
        store.add_rule(1, "netflix", 3, 10);

        let matcher = RuleMatcher::new(&store);
        let suggestion = matcher.match_description(1, "HULU").unwrap();
        assert!(suggestion.is_empty());
    }

    #[test]
    fn test_other_users_rules_are_ignored() {
        let store = MemoryStore::new();
        store.add_rule(2, "netflix", 3, 10);

        let matcher = RuleMatcher::new(&store);
        assert!(matcher.match_description(1, "NETFLIX.COM").unwrap().is_empty());
    }

    #[test]
    fn test_archived_and_inactive_rules_are_skipped() {
        let store = MemoryStore::new();
        let archived = store.add_rule(1, "netflix", 3, 1);
        store.archive_rule(archived);
        let inactive = store.add_rule(1, "netflix", 4, 2);
        store.set_rule_active(inactive, false);
        store.add_rule(1, "netflix", 5, 3);

        let matcher = RuleMatcher::new(&store);
        let suggestion = matcher.match_description(1, "NETFLIX.COM").unwrap();
        assert_eq!(suggestion.category_id, Some(5));
    }

    #[test]
    fn test_matching_rules_lists_all_in_order() {
        let store = MemoryStore::new();
        store.add_rule(1, "foods", 20, 20);
        store.add_rule(1, "whole foods", 10, 10);
        store.add_rule(1, "target", 30, 5);

        let matcher = RuleMatcher::new(&store);
        let matches = matcher.matching_rules(1, "Whole Foods Store").unwrap();
        let patterns: Vec<&str> = matches.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["whole foods", "foods"]);
    }
}
