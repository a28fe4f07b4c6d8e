//! Learned category pattern operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{format_datetime, parse_datetime, Database, DbConn};
use crate::error::Result;
use crate::models::{
    reinforced_confidence, LearnedCategoryPattern, PatternUpsert, UpsertOutcome,
    BASE_CONFIDENCE, CONFIDENCE_STEP, MAX_CONFIDENCE, PATTERN_SURVIVAL_CONFIDENCE,
};
use crate::store::PatternRepository;

const PATTERN_COLUMNS: &str = "id, user_id, keyword, category_id, confidence, occurrence_count, \
                               active, first_learned_at, last_matched_at";

impl Database {
    /// Get a learned pattern by ID
    pub fn get_learned_pattern(&self, id: i64) -> Result<Option<LearnedCategoryPattern>> {
        let conn = self.conn()?;
        Self::fetch_pattern(&conn, id)
    }

    /// List every learned pattern for a user, highest confidence first
    pub fn list_learned_patterns(&self, user_id: i64) -> Result<Vec<LearnedCategoryPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM learned_category_patterns
            WHERE user_id = ?
            ORDER BY confidence DESC, keyword, id
            "#,
            PATTERN_COLUMNS
        ))?;

        let patterns = stmt
            .query_map(params![user_id], Self::row_to_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patterns)
    }

    fn fetch_pattern(conn: &DbConn, id: i64) -> Result<Option<LearnedCategoryPattern>> {
        let pattern = conn
            .query_row(
                &format!(
                    "SELECT {} FROM learned_category_patterns WHERE id = ?",
                    PATTERN_COLUMNS
                ),
                params![id],
                Self::row_to_pattern,
            )
            .optional()?;

        Ok(pattern)
    }

    /// Helper to convert a row to LearnedCategoryPattern
    /// Column order: id, user_id, keyword, category_id, confidence, occurrence_count,
    ///               active, first_learned_at, last_matched_at
    fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<LearnedCategoryPattern> {
        let first_learned_str: String = row.get(7)?;
        let last_matched_str: String = row.get(8)?;
        Ok(LearnedCategoryPattern {
            id: row.get(0)?,
            user_id: row.get(1)?,
            keyword: row.get(2)?,
            category_id: row.get(3)?,
            confidence: row.get(4)?,
            occurrence_count: row.get(5)?,
            active: row.get(6)?,
            first_learned_at: parse_datetime(&first_learned_str),
            last_matched_at: parse_datetime(&last_matched_str),
        })
    }
}

impl PatternRepository for Database {
    fn matchable_patterns_for(
        &self,
        user_id: i64,
        min_confidence: i32,
    ) -> Result<Vec<LearnedCategoryPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM learned_category_patterns
            WHERE user_id = ? AND active = 1 AND confidence >= ?
            ORDER BY category_id, confidence DESC, id
            "#,
            PATTERN_COLUMNS
        ))?;

        let patterns = stmt
            .query_map(params![user_id, min_confidence], Self::row_to_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patterns)
    }

    fn pattern(&self, pattern_id: i64) -> Result<Option<LearnedCategoryPattern>> {
        self.get_learned_pattern(pattern_id)
    }

    fn patterns_for(&self, user_id: i64) -> Result<Vec<LearnedCategoryPattern>> {
        self.list_learned_patterns(user_id)
    }

    /// Insert-or-reinforce inside an IMMEDIATE transaction. The write lock is
    /// taken up front, so two concurrent observations of the same triple
    /// serialize and both increments land.
    fn upsert_pattern_observation(
        &self,
        user_id: i64,
        keyword: &str,
        category_id: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<PatternUpsert> {
        let keyword = keyword.to_lowercase();
        let observed = format_datetime(&observed_at);

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            r#"
            INSERT INTO learned_category_patterns
                (user_id, keyword, category_id, confidence, occurrence_count, active,
                 first_learned_at, last_matched_at)
            VALUES (?, ?, ?, ?, 1, 1, ?, ?)
            ON CONFLICT(user_id, keyword, category_id) DO NOTHING
            "#,
            params![
                user_id,
                keyword,
                category_id,
                reinforced_confidence(1),
                observed,
                observed
            ],
        )?;

        let outcome = if inserted == 1 {
            UpsertOutcome::Inserted
        } else {
            tx.execute(
                r#"
                UPDATE learned_category_patterns
                SET occurrence_count = occurrence_count + 1,
                    confidence = MIN(?, ? + (occurrence_count + 1) * ?),
                    last_matched_at = ?
                WHERE user_id = ? AND keyword = ? AND category_id = ?
                "#,
                params![
                    MAX_CONFIDENCE,
                    BASE_CONFIDENCE,
                    CONFIDENCE_STEP,
                    observed,
                    user_id,
                    keyword,
                    category_id
                ],
            )?;
            UpsertOutcome::Updated
        };

        let pattern = tx.query_row(
            &format!(
                r#"
                SELECT {} FROM learned_category_patterns
                WHERE user_id = ? AND keyword = ? AND category_id = ?
                "#,
                PATTERN_COLUMNS
            ),
            params![user_id, keyword, category_id],
            Self::row_to_pattern,
        )?;

        tx.commit()?;

        debug!(
            "Pattern '{}' -> category {} {:?}: {}% after {} occurrences",
            pattern.keyword, pattern.category_id, outcome, pattern.confidence, pattern.occurrence_count
        );
        Ok(PatternUpsert { pattern, outcome })
    }

    fn penalize_pattern(
        &self,
        pattern_id: i64,
        amount: i32,
    ) -> Result<Option<LearnedCategoryPattern>> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE learned_category_patterns
            SET confidence = MAX(0, confidence - ?1),
                active = (MAX(0, confidence - ?1) >= ?2)
            WHERE id = ?3
            "#,
            params![amount, PATTERN_SURVIVAL_CONFIDENCE, pattern_id],
        )?;

        Self::fetch_pattern(&conn, pattern_id)
    }

    fn deactivate_patterns(&self, user_id: i64, category_id: Option<i64>) -> Result<usize> {
        let conn = self.conn()?;
        let disabled = conn.execute(
            r#"
            UPDATE learned_category_patterns
            SET active = 0
            WHERE user_id = ?1 AND active = 1 AND (?2 IS NULL OR category_id = ?2)
            "#,
            params![user_id, category_id],
        )?;

        Ok(disabled)
    }
}
