//! Learned pattern maintenance: penalties, resets, rankings and statistics

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{
    CorrectionType, CorrectionTypeCount, LearnedCategoryPattern, PatternStats, Suggestion,
    SuggestionSource, DEFAULT_PENALTY,
};
use crate::store::{CorrectionLog, PatternRepository, RuleWriter};

/// Days counted as "this week" for learning velocity
const VELOCITY_WINDOW_DAYS: i64 = 7;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keeps a user's learned patterns healthy
pub struct PatternMaintainer<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> PatternMaintainer<'a, S>
where
    S: PatternRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Lower a pattern's confidence by `amount`; it deactivates below 30
    pub fn penalize(&self, pattern_id: i64, amount: i32) -> Result<LearnedCategoryPattern> {
        if amount < 0 {
            return Err(Error::Validation(format!(
                "Penalty must not be negative (got {})",
                amount
            )));
        }

        let pattern = self
            .store
            .penalize_pattern(pattern_id, amount)?
            .ok_or_else(|| Error::NotFound(format!("Learned pattern {}", pattern_id)))?;

        debug!(
            "Penalized pattern #{} '{}' by {} -> {}% (active: {})",
            pattern.id, pattern.keyword, amount, pattern.confidence, pattern.active
        );
        Ok(pattern)
    }

    /// Penalize the learned patterns behind a suggestion the user turned down.
    ///
    /// Rule suggestions are left alone; rules are only changed by the user.
    /// Disabled patterns are skipped so a reset stays in force.
    pub fn reject_learned_suggestion(
        &self,
        user_id: i64,
        suggestion: &Suggestion,
    ) -> Result<Vec<LearnedCategoryPattern>> {
        let category_id = match (suggestion.source, suggestion.category_id) {
            (Some(SuggestionSource::LearnedKeyword), Some(category_id)) => category_id,
            _ => return Ok(Vec::new()),
        };

        let targets: Vec<i64> = self
            .store
            .patterns_for(user_id)?
            .into_iter()
            .filter(|p| {
                p.active
                    && p.category_id == category_id
                    && suggestion.matched_keywords.contains(&p.keyword)
            })
            .map(|p| p.id)
            .collect();

        let mut penalized = Vec::with_capacity(targets.len());
        for id in targets {
            penalized.push(self.penalize(id, DEFAULT_PENALTY)?);
        }

        info!(
            "Rejected learned suggestion for category {}: {} patterns penalized",
            category_id,
            penalized.len()
        );
        Ok(penalized)
    }

    /// Disable a user's patterns (optionally for one category). Rows are kept.
    pub fn reset(&self, user_id: i64, category_id: Option<i64>) -> Result<usize> {
        let disabled = self.store.deactivate_patterns(user_id, category_id)?;
        info!(
            "Reset learned patterns for user {} (category: {:?}): {} disabled",
            user_id, category_id, disabled
        );
        Ok(disabled)
    }

    /// Highest-confidence active patterns, ties broken by occurrence count
    pub fn top_patterns(&self, user_id: i64, limit: usize) -> Result<Vec<LearnedCategoryPattern>> {
        let mut patterns: Vec<_> = self
            .store
            .patterns_for(user_id)?
            .into_iter()
            .filter(|p| p.active)
            .collect();

        patterns.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then(b.occurrence_count.cmp(&a.occurrence_count))
                .then(a.id.cmp(&b.id))
        });
        patterns.truncate(limit);
        Ok(patterns)
    }

    /// Well-observed active patterns that still sit below `min_confidence`
    pub fn underperforming_patterns(
        &self,
        user_id: i64,
        min_confidence: i32,
        min_occurrences: i64,
    ) -> Result<Vec<LearnedCategoryPattern>> {
        let mut patterns: Vec<_> = self
            .store
            .patterns_for(user_id)?
            .into_iter()
            .filter(|p| {
                p.active && p.confidence < min_confidence && p.occurrence_count >= min_occurrences
            })
            .collect();

        patterns.sort_by(|a, b| a.confidence.cmp(&b.confidence).then(a.id.cmp(&b.id)));
        Ok(patterns)
    }

    /// Turn a learned pattern into an explicit rule for its keyword and category
    pub fn promote_to_rule(&self, pattern_id: i64, priority: i32) -> Result<i64>
    where
        S: RuleWriter,
    {
        let pattern = self
            .store
            .pattern(pattern_id)?
            .ok_or_else(|| Error::NotFound(format!("Learned pattern {}", pattern_id)))?;

        let rule_id =
            self.store
                .create_rule(pattern.user_id, &pattern.keyword, pattern.category_id, priority)?;

        info!(
            "Promoted pattern #{} '{}' to rule #{} (priority {})",
            pattern.id, pattern.keyword, rule_id, priority
        );
        Ok(rule_id)
    }
}

impl<'a, S> PatternMaintainer<'a, S>
where
    S: PatternRepository + CorrectionLog + ?Sized,
{
    /// Aggregate pattern and correction statistics for a user
    pub fn statistics(&self, user_id: i64) -> Result<PatternStats> {
        self.statistics_at(user_id, Utc::now())
    }

    /// Statistics with "this week" measured back from `now`
    pub fn statistics_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<PatternStats> {
        let patterns = self.store.patterns_for(user_id)?;
        let mut stats = PatternStats::empty();

        stats.total_patterns = patterns.len() as i64;
        stats.active_patterns = patterns.iter().filter(|p| p.active).count() as i64;
        stats.disabled_patterns = stats.total_patterns - stats.active_patterns;

        if !patterns.is_empty() {
            let sum: i64 = patterns.iter().map(|p| i64::from(p.confidence)).sum();
            stats.average_confidence = round2(sum as f64 / patterns.len() as f64);
            stats.max_confidence = patterns.iter().map(|p| p.confidence).max().unwrap_or(0);
        }
        stats.min_active_confidence = patterns
            .iter()
            .filter(|p| p.active)
            .map(|p| p.confidence)
            .min()
            .unwrap_or(0);

        let counts = self.store.correction_counts_by_type(user_id)?;
        stats.corrections_by_type = CorrectionType::all()
            .iter()
            .map(|t| CorrectionTypeCount {
                correction_type: *t,
                count: counts
                    .iter()
                    .filter(|(ct, _)| ct == t)
                    .map(|(_, n)| *n)
                    .sum(),
            })
            .collect();
        stats.total_corrections = stats.corrections_by_type.iter().map(|c| c.count).sum();

        let week_start = now - Duration::days(VELOCITY_WINDOW_DAYS);
        stats.patterns_learned_this_week = patterns
            .iter()
            .filter(|p| p.first_learned_at >= week_start)
            .count() as i64;
        stats.learning_velocity =
            round2(stats.patterns_learned_this_week as f64 / VELOCITY_WINDOW_DAYS as f64);

        Ok(stats)
    }
}
