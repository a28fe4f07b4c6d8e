//! Learned keyword pattern matching
//!
//! Patterns are grouped by category and scanned in order. The category owning
//! the single highest-confidence matching pattern wins, and the reported
//! keywords are the category's matches accumulated up to the moment its best
//! confidence was last raised. Matches after that point (which by ordering have
//! equal or lower confidence) are not reported.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::keywords::extract_keywords;
use crate::models::{LearnedCategoryPattern, Suggestion, SuggestionSource, MIN_MATCH_CONFIDENCE};
use crate::store::PatternRepository;

/// Evaluates a user's learned patterns against descriptions
pub struct LearnedPatternMatcher<'a, P: PatternRepository + ?Sized> {
    patterns: &'a P,
}

struct BestMatch {
    category_id: i64,
    confidence: i32,
    keywords: Vec<String>,
}

impl<'a, P: PatternRepository + ?Sized> LearnedPatternMatcher<'a, P> {
    pub fn new(patterns: &'a P) -> Self {
        Self { patterns }
    }

    /// Suggest a category from learned patterns, or an empty suggestion
    pub fn match_description(&self, user_id: i64, description: &str) -> Result<Suggestion> {
        let keywords = extract_keywords(description);
        if keywords.is_empty() {
            return Ok(Suggestion::empty());
        }

        let patterns = self
            .patterns
            .matchable_patterns_for(user_id, MIN_MATCH_CONFIDENCE)?;

        let mut by_category: BTreeMap<i64, Vec<&LearnedCategoryPattern>> = BTreeMap::new();
        for pattern in patterns.iter().filter(|p| p.can_suggest()) {
            by_category.entry(pattern.category_id).or_default().push(pattern);
        }

        let mut best: Option<BestMatch> = None;

        for (category_id, category_patterns) in &by_category {
            let mut category_keywords: Vec<String> = Vec::new();

            for pattern in category_patterns {
                if !keywords.iter().any(|k| pattern.matches_keyword(k)) {
                    continue;
                }

                category_keywords.push(pattern.keyword.clone());

                let raises_best = best
                    .as_ref()
                    .map_or(true, |b| pattern.confidence > b.confidence);
                if raises_best {
                    best = Some(BestMatch {
                        category_id: *category_id,
                        confidence: pattern.confidence,
                        keywords: category_keywords.clone(),
                    });
                }
            }
        }

        match best {
            Some(best) => {
                debug!(
                    "Learned patterns {:?} matched '{}' -> category {} ({}%)",
                    best.keywords, description, best.category_id, best.confidence
                );
                Ok(Suggestion {
                    category_id: Some(best.category_id),
                    confidence: best.confidence,
                    matched_keywords: best.keywords,
                    source: Some(SuggestionSource::LearnedKeyword),
                    auto_apply: false,
                })
            }
            None => Ok(Suggestion::empty()),
        }
    }
}
