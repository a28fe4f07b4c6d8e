//! Learning from user corrections
//!
//! A correction is two separate steps: the audit row is appended first and
//! stays even if a pattern update later fails, then every keyword of the
//! description reinforces (or creates) the pattern pointing at the corrected
//! category.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::keywords::extract_keywords;
use crate::models::{CorrectionOutcome, CorrectionType, NewCorrection, Transaction, MAX_CONFIDENCE};
use crate::store::{CorrectionLog, PatternRepository};

/// Records corrections and feeds them back into learned patterns
pub struct CorrectionLearner<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CorrectionLearner<'a, S>
where
    S: PatternRepository + CorrectionLog + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Record a correction and reinforce the patterns it implies
    pub fn learn_from_correction(
        &self,
        transaction: &Transaction,
        corrected_category_id: i64,
        correction_type: CorrectionType,
        confidence_at_correction: Option<i32>,
    ) -> Result<CorrectionOutcome> {
        let user_id = transaction.user_id.ok_or_else(|| {
            Error::Validation(format!(
                "Transaction {} has no owner; cannot learn from it",
                transaction.id
            ))
        })?;

        if let Some(confidence) = confidence_at_correction {
            if !(0..=MAX_CONFIDENCE).contains(&confidence) {
                return Err(Error::Validation(format!(
                    "Confidence {} is out of range (0-{})",
                    confidence, MAX_CONFIDENCE
                )));
            }
        }

        let correction_id = self.store.append_correction(&NewCorrection {
            user_id,
            transaction_id: transaction.id,
            original_category_id: transaction.category_id,
            corrected_category_id,
            description: transaction.description.clone(),
            correction_type,
            confidence_at_correction,
        })?;

        let keywords = extract_keywords(&transaction.description);
        if keywords.is_empty() {
            warn!(
                "Correction #{} for transaction {} has no keywords to learn from",
                correction_id, transaction.id
            );
        }

        let now = Utc::now();
        let mut upserts = Vec::with_capacity(keywords.len());
        for keyword in &keywords {
            upserts.push(self.store.upsert_pattern_observation(
                user_id,
                keyword,
                corrected_category_id,
                now,
            )?);
        }

        let outcome = CorrectionOutcome {
            correction_id,
            upserts,
        };

        info!(
            "Learned from correction #{} ({}): {} patterns created, {} reinforced -> category {}",
            correction_id,
            correction_type,
            outcome.patterns_created(),
            outcome.patterns_reinforced(),
            corrected_category_id
        );

        Ok(outcome)
    }
}

/// Parse a correction type coming from outside the engine
pub fn parse_correction_type(value: &str) -> Result<CorrectionType> {
    value.parse().map_err(Error::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpsertOutcome;
    use crate::test_utils::MemoryStore;

    #[test]
    fn test_first_correction_creates_pattern_at_55() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "AMAZON");
        let learner = CorrectionLearner::new(&store);

        let outcome = learner
            .learn_from_correction(&tx, 7, CorrectionType::MissingCategory, None)
            .unwrap();

        assert_eq!(outcome.upserts.len(), 1);
        assert_eq!(outcome.upserts[0].outcome, UpsertOutcome::Inserted);

        let pattern = store.find_pattern(1, "amazon", 7).unwrap();
        assert_eq!(pattern.confidence, 55);
        assert_eq!(pattern.occurrence_count, 1);
        assert!(pattern.active);
    }

    #[test]
    fn test_second_correction_reinforces_to_60() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "AMAZON");
        let learner = CorrectionLearner::new(&store);

        learner
            .learn_from_correction(&tx, 7, CorrectionType::MissingCategory, None)
            .unwrap();
        let outcome = learner
            .learn_from_correction(&tx, 7, CorrectionType::WrongAutoChoice, Some(80))
            .unwrap();

        assert_eq!(outcome.upserts[0].outcome, UpsertOutcome::Updated);
        let pattern = store.find_pattern(1, "amazon", 7).unwrap();
        assert_eq!(pattern.confidence, 60);
        assert_eq!(pattern.occurrence_count, 2);
        assert_eq!(store.correction_count(), 2);
    }

    #[test]
    fn test_every_keyword_is_learned() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "Blue Bottle Coffee Oakland");
        let learner = CorrectionLearner::new(&store);

        let outcome = learner
            .learn_from_correction(&tx, 3, CorrectionType::AutoToManual, Some(92))
            .unwrap();

        assert_eq!(outcome.patterns_created(), 4);
        for keyword in ["blue", "bottle", "coffee", "oakland"] {
            assert!(store.find_pattern(1, keyword, 3).is_some(), "{keyword}");
        }
    }

    #[test]
    fn test_same_keyword_different_category_is_separate_pattern() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "TARGET");
        let learner = CorrectionLearner::new(&store);

        learner
            .learn_from_correction(&tx, 1, CorrectionType::MissingCategory, None)
            .unwrap();
        learner
            .learn_from_correction(&tx, 2, CorrectionType::WrongAutoChoice, None)
            .unwrap();

        assert_eq!(store.find_pattern(1, "target", 1).unwrap().occurrence_count, 1);
        assert_eq!(store.find_pattern(1, "target", 2).unwrap().occurrence_count, 1);
    }

    #[test]
    fn test_confidence_saturates_at_100() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "COSTCO");
        let learner = CorrectionLearner::new(&store);

        for _ in 0..12 {
            learner
                .learn_from_correction(&tx, 4, CorrectionType::AutoToManual, None)
                .unwrap();
        }

        let pattern = store.find_pattern(1, "costco", 4).unwrap();
        assert_eq!(pattern.occurrence_count, 12);
        assert_eq!(pattern.confidence, 100);
    }

    #[test]
    fn test_out_of_range_confidence_is_rejected_before_writing() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "AMAZON");
        let learner = CorrectionLearner::new(&store);

        let err = learner
            .learn_from_correction(&tx, 7, CorrectionType::ConfidenceOverride, Some(101))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.correction_count(), 0);
        assert!(store.find_pattern(1, "amazon", 7).is_none());
    }

    #[test]
    fn test_missing_owner_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.transaction_for(1, "AMAZON");
        tx.user_id = None;

        let learner = CorrectionLearner::new(&store);
        let err = learner
            .learn_from_correction(&tx, 7, CorrectionType::MissingCategory, None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_correction_without_keywords_is_still_recorded() {
        let store = MemoryStore::new();
        let tx = store.transaction_for(1, "#1 ab");
        let learner = CorrectionLearner::new(&store);

        let outcome = learner
            .learn_from_correction(&tx, 7, CorrectionType::MissingCategory, None)
            .unwrap();
        assert!(outcome.upserts.is_empty());
        assert_eq!(store.correction_count(), 1);
    }

    #[test]
    fn test_parse_correction_type_is_validation_error() {
        assert_eq!(
            parse_correction_type("auto_to_manual").unwrap(),
            CorrectionType::AutoToManual
        );
        assert!(matches!(
            parse_correction_type("nope"),
            Err(Error::Validation(_))
        ));
    }
}
