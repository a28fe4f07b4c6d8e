//! Read-only analysis of a user's rule set and uncategorized backlog

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{
    AutoCategoryRule, CategoryCoverage, CoverageReport, RuleOverlap, SuggestionSource,
    UncoveredReason, OVERLAP_WARNING,
};
use crate::store::{PatternRepository, RuleRepository, ThresholdSource, TransactionSource};
use crate::suggest::SuggestionEngine;

fn patterns_overlap(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Finds rules that shadow one another
pub struct OverlapAnalyzer<'a, R: RuleRepository + ?Sized> {
    rules: &'a R,
}

impl<'a, R: RuleRepository + ?Sized> OverlapAnalyzer<'a, R> {
    pub fn new(rules: &'a R) -> Self {
        Self { rules }
    }

    /// Every pair of active rules where one pattern contains the other.
    ///
    /// Pairs are reported in evaluation order, so `first_*` is always the rule
    /// that would be tried first.
    pub fn detect_overlaps(&self, user_id: i64) -> Result<Vec<RuleOverlap>> {
        let rules = self.rules.active_rules_for(user_id)?;
        let mut overlaps = Vec::new();

        for (i, first) in rules.iter().enumerate() {
            for second in &rules[i + 1..] {
                if patterns_overlap(&first.pattern, &second.pattern) {
                    overlaps.push(RuleOverlap {
                        first_rule_id: first.id,
                        first_pattern: first.pattern.clone(),
                        first_priority: first.priority,
                        second_rule_id: second.id,
                        second_pattern: second.pattern.clone(),
                        second_priority: second.priority,
                        message: OVERLAP_WARNING.to_string(),
                    });
                }
            }
        }

        debug!(
            "Found {} overlapping rule pairs among {} rules for user {}",
            overlaps.len(),
            rules.len(),
            user_id
        );
        Ok(overlaps)
    }

    /// Existing active rules a new `pattern` would overlap with
    pub fn overlaps_for_pattern(
        &self,
        user_id: i64,
        pattern: &str,
    ) -> Result<Vec<AutoCategoryRule>> {
        Ok(self
            .rules
            .active_rules_for(user_id)?
            .into_iter()
            .filter(|rule| patterns_overlap(&rule.pattern, pattern))
            .collect())
    }
}

struct CategoryTally {
    count: i64,
    source: SuggestionSource,
}

/// Measures how much of an uncategorized backlog would be categorized today
pub struct CoverageTester<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    threshold: &'a T,
}

impl<'a, S, T> CoverageTester<'a, S, T>
where
    S: TransactionSource + RuleRepository + PatternRepository + ?Sized,
    T: ThresholdSource + ?Sized,
{
    pub fn new(store: &'a S, threshold: &'a T) -> Self {
        Self { store, threshold }
    }

    /// Dry-run the suggestion engine over uncategorized transactions in `[from, to]`
    pub fn test_coverage(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CoverageReport> {
        let transactions = self.store.uncategorized_transactions(user_id, from, to)?;
        if transactions.is_empty() {
            return Ok(CoverageReport::empty());
        }

        let engine = SuggestionEngine::new(self.store, self.threshold);
        let mut report = CoverageReport::empty();
        let mut tallies: HashMap<i64, CategoryTally> = HashMap::new();

        for tx in &transactions {
            report.total += 1;

            if tx.description.trim().is_empty() {
                *report
                    .uncovered_reasons
                    .entry(UncoveredReason::MissingDescription.to_string())
                    .or_insert(0) += 1;
                continue;
            }

            let suggestion = engine.suggest(tx)?;
            match (suggestion.category_id, suggestion.source) {
                (Some(category_id), Some(source)) => {
                    report.would_be_categorized += 1;
                    tallies
                        .entry(category_id)
                        .or_insert(CategoryTally { count: 0, source })
                        .count += 1;
                }
                _ => {
                    *report
                        .uncovered_reasons
                        .entry(UncoveredReason::NoMatchingPattern.to_string())
                        .or_insert(0) += 1;
                }
            }
        }

        report.coverage_percentage = report.would_be_categorized * 100 / report.total;

        let mut by_category = Vec::with_capacity(tallies.len());
        for (category_id, tally) in tallies {
            by_category.push(CategoryCoverage {
                category_id,
                category_name: self.store.category_name(category_id)?,
                count: tally.count,
                source: tally.source,
            });
        }
        by_category.sort_by(|a, b| b.count.cmp(&a.count).then(a.category_id.cmp(&b.category_id)));
        report.by_category = by_category;

        info!(
            "Coverage for user {} ({} to {}): {}/{} ({}%)",
            user_id, from, to, report.would_be_categorized, report.total, report.coverage_percentage
        );
        Ok(report)
    }
}
