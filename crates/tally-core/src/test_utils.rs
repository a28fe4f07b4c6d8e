//! Test utilities for tally-core
//!
//! `MemoryStore` implements every repository trait over plain vectors so the
//! engine can be unit tested without SQLite.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::models::{
    reinforced_confidence, AutoCategoryCorrection, AutoCategoryRule, Category, CorrectionType,
    LearnedCategoryPattern, NewCorrection, PatternUpsert, Transaction, UpsertOutcome,
};
use crate::store::{
    CorrectionLog, PatternRepository, RuleRepository, RuleWriter, TransactionSource,
};

#[derive(Default)]
struct State {
    next_id: i64,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    rules: Vec<AutoCategoryRule>,
    patterns: Vec<LearnedCategoryPattern>,
    corrections: Vec<AutoCategoryCorrection>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory repository for engine tests
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_category(&self, user_id: i64, name: &str) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.categories.push(Category {
            id,
            user_id,
            name: name.to_string(),
            created_at: Utc::now(),
        });
        id
    }

    /// Add a transaction dated `date` (YYYY-MM-DD)
    pub fn add_transaction(
        &self,
        user_id: i64,
        date: &str,
        description: &str,
        category_id: Option<i64>,
    ) -> i64 {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let mut state = self.state();
        let id = state.next_id();
        state.transactions.push(Transaction {
            id,
            user_id: Some(user_id),
            date,
            description: description.to_string(),
            amount: -10.0,
            category_id,
            created_at: Utc::now(),
        });
        id
    }

    /// Store an uncategorized transaction dated today and return it
    pub fn transaction_for(&self, user_id: i64, description: &str) -> Transaction {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let id = self.add_transaction(user_id, &today, description, None);
        self.state()
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .unwrap()
    }

    pub fn add_rule(&self, user_id: i64, pattern: &str, category_id: i64, priority: i32) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.rules.push(AutoCategoryRule {
            id,
            user_id,
            pattern: pattern.to_string(),
            category_id,
            priority,
            active: true,
            archived: false,
            created_at: Utc::now(),
        });
        id
    }

    pub fn archive_rule(&self, rule_id: i64) {
        if let Some(rule) = self.state().rules.iter_mut().find(|r| r.id == rule_id) {
            rule.archived = true;
        }
    }

    pub fn set_rule_active(&self, rule_id: i64, active: bool) {
        if let Some(rule) = self.state().rules.iter_mut().find(|r| r.id == rule_id) {
            rule.active = active;
        }
    }

    /// Every rule for a user, including archived and inactive ones
    pub fn rules_for(&self, user_id: i64) -> Vec<AutoCategoryRule> {
        self.state()
            .rules
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn add_pattern(
        &self,
        user_id: i64,
        keyword: &str,
        category_id: i64,
        confidence: i32,
        occurrence_count: i64,
    ) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        let now = Utc::now();
        state.patterns.push(LearnedCategoryPattern {
            id,
            user_id,
            keyword: keyword.to_lowercase(),
            category_id,
            confidence,
            occurrence_count,
            active: true,
            first_learned_at: now,
            last_matched_at: now,
        });
        id
    }

    pub fn set_pattern_active(&self, pattern_id: i64, active: bool) {
        if let Some(p) = self.state().patterns.iter_mut().find(|p| p.id == pattern_id) {
            p.active = active;
        }
    }

    pub fn set_first_learned_at(&self, pattern_id: i64, at: DateTime<Utc>) {
        if let Some(p) = self.state().patterns.iter_mut().find(|p| p.id == pattern_id) {
            p.first_learned_at = at;
        }
    }

    pub fn find_pattern(
        &self,
        user_id: i64,
        keyword: &str,
        category_id: i64,
    ) -> Option<LearnedCategoryPattern> {
        self.state()
            .patterns
            .iter()
            .find(|p| p.user_id == user_id && p.keyword == keyword && p.category_id == category_id)
            .cloned()
    }

    pub fn correction_count(&self) -> usize {
        self.state().corrections.len()
    }
}

impl TransactionSource for MemoryStore {
    fn transaction(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self.state().transactions.iter().find(|t| t.id == id).cloned())
    }

    fn uncategorized_transactions(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let mut txs: Vec<Transaction> = self
            .state()
            .transactions
            .iter()
            .filter(|t| {
                t.user_id == Some(user_id)
                    && t.category_id.is_none()
                    && t.date >= from
                    && t.date <= to
            })
            .cloned()
            .collect();
        txs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(txs)
    }

    fn category_name(&self, category_id: i64) -> Result<Option<String>> {
        Ok(self
            .state()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name.clone()))
    }
}

impl RuleRepository for MemoryStore {
    fn active_rules_for(&self, user_id: i64) -> Result<Vec<AutoCategoryRule>> {
        let mut rules: Vec<AutoCategoryRule> = self
            .state()
            .rules
            .iter()
            .filter(|r| r.user_id == user_id && r.active && !r.archived)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Ok(rules)
    }
}

impl RuleWriter for MemoryStore {
    fn create_rule(
        &self,
        user_id: i64,
        pattern: &str,
        category_id: i64,
        priority: i32,
    ) -> Result<i64> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(Error::Validation("Rule pattern cannot be empty".into()));
        }
        Ok(self.add_rule(user_id, pattern, category_id, priority))
    }
}

impl PatternRepository for MemoryStore {
    fn matchable_patterns_for(
        &self,
        user_id: i64,
        min_confidence: i32,
    ) -> Result<Vec<LearnedCategoryPattern>> {
        let mut patterns: Vec<LearnedCategoryPattern> = self
            .state()
            .patterns
            .iter()
            .filter(|p| p.user_id == user_id && p.active && p.confidence >= min_confidence)
            .cloned()
            .collect();
        patterns.sort_by(|a, b| {
            a.category_id
                .cmp(&b.category_id)
                .then(b.confidence.cmp(&a.confidence))
                .then(a.id.cmp(&b.id))
        });
        Ok(patterns)
    }

    fn pattern(&self, pattern_id: i64) -> Result<Option<LearnedCategoryPattern>> {
        Ok(self
            .state()
            .patterns
            .iter()
            .find(|p| p.id == pattern_id)
            .cloned())
    }

    fn patterns_for(&self, user_id: i64) -> Result<Vec<LearnedCategoryPattern>> {
        Ok(self
            .state()
            .patterns
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    fn upsert_pattern_observation(
        &self,
        user_id: i64,
        keyword: &str,
        category_id: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<PatternUpsert> {
        let keyword = keyword.to_lowercase();
        let mut state = self.state();

        if let Some(p) = state
            .patterns
            .iter_mut()
            .find(|p| p.user_id == user_id && p.keyword == keyword && p.category_id == category_id)
        {
            p.occurrence_count += 1;
            p.confidence = reinforced_confidence(p.occurrence_count);
            p.last_matched_at = observed_at;
            return Ok(PatternUpsert {
                pattern: p.clone(),
                outcome: UpsertOutcome::Updated,
            });
        }

        let id = state.next_id();
        let pattern = LearnedCategoryPattern {
            id,
            user_id,
            keyword,
            category_id,
            confidence: reinforced_confidence(1),
            occurrence_count: 1,
            active: true,
            first_learned_at: observed_at,
            last_matched_at: observed_at,
        };
        state.patterns.push(pattern.clone());
        Ok(PatternUpsert {
            pattern,
            outcome: UpsertOutcome::Inserted,
        })
    }

    fn penalize_pattern(
        &self,
        pattern_id: i64,
        amount: i32,
    ) -> Result<Option<LearnedCategoryPattern>> {
        let mut state = self.state();
        Ok(state
            .patterns
            .iter_mut()
            .find(|p| p.id == pattern_id)
            .map(|p| {
                p.apply_penalty(amount);
                p.clone()
            }))
    }

    fn deactivate_patterns(&self, user_id: i64, category_id: Option<i64>) -> Result<usize> {
        let mut disabled = 0;
        for p in self.state().patterns.iter_mut() {
            if p.user_id == user_id
                && p.active
                && category_id.map_or(true, |c| p.category_id == c)
            {
                p.active = false;
                disabled += 1;
            }
        }
        Ok(disabled)
    }
}

impl CorrectionLog for MemoryStore {
    fn append_correction(&self, correction: &NewCorrection) -> Result<i64> {
        let mut state = self.state();
        let id = state.next_id();
        state.corrections.push(AutoCategoryCorrection {
            id,
            user_id: correction.user_id,
            transaction_id: correction.transaction_id,
            original_category_id: correction.original_category_id,
            corrected_category_id: correction.corrected_category_id,
            description: correction.description.clone(),
            correction_type: correction.correction_type,
            confidence_at_correction: correction.confidence_at_correction,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn correction_counts_by_type(&self, user_id: i64) -> Result<Vec<(CorrectionType, i64)>> {
        let state = self.state();
        Ok(CorrectionType::all()
            .iter()
            .map(|t| {
                let count = state
                    .corrections
                    .iter()
                    .filter(|c| c.user_id == user_id && c.correction_type == *t)
                    .count() as i64;
                (*t, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect())
    }
}
