//! Suggestion log operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewSuggestionLog, SuggestionLog, SuggestionOutcome};

impl Database {
    /// Record a suggestion that was shown (or auto-applied) for a transaction
    pub fn log_suggestion(&self, entry: &NewSuggestionLog) -> Result<i64> {
        let keywords = serde_json::to_string(&entry.matched_keywords)?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO auto_category_suggestion_logs
                (user_id, transaction_id, suggested_category_id, confidence,
                 matched_keywords, source, auto_applied)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.user_id,
                entry.transaction_id,
                entry.suggested_category_id,
                entry.confidence,
                keywords,
                entry.source.map(|s| s.as_str()),
                entry.auto_applied,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Mark a logged suggestion as accepted or rejected
    pub fn resolve_suggestion(&self, log_id: i64, outcome: SuggestionOutcome) -> Result<()> {
        if outcome == SuggestionOutcome::Pending {
            return Err(Error::Validation(
                "A suggestion can only be resolved as accepted or rejected".into(),
            ));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE auto_category_suggestion_logs
            SET outcome = ?, resolved_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![outcome.as_str(), log_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Suggestion log {}", log_id)));
        }
        Ok(())
    }

    /// Get a suggestion log entry by ID
    pub fn get_suggestion_log(&self, id: i64) -> Result<Option<SuggestionLog>> {
        let conn = self.conn()?;

        let log = conn
            .query_row(
                r#"
                SELECT id, user_id, transaction_id, suggested_category_id, confidence,
                       matched_keywords, source, auto_applied, outcome, created_at
                FROM auto_category_suggestion_logs WHERE id = ?
                "#,
                params![id],
                |row| {
                    let keywords_json: String = row.get(5)?;
                    let source_str: Option<String> = row.get(6)?;
                    let outcome_str: String = row.get(8)?;
                    let created_at_str: String = row.get(9)?;
                    Ok(SuggestionLog {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        transaction_id: row.get(2)?,
                        suggested_category_id: row.get(3)?,
                        confidence: row.get(4)?,
                        matched_keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
                        source: source_str.and_then(|s| s.parse().ok()),
                        auto_applied: row.get(7)?,
                        outcome: outcome_str.parse().unwrap_or_default(),
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;

        Ok(log)
    }

    /// Most recent pending suggestion logged for a transaction
    pub fn latest_pending_suggestion(&self, transaction_id: i64) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                r#"
                SELECT id FROM auto_category_suggestion_logs
                WHERE transaction_id = ? AND outcome = 'pending'
                ORDER BY id DESC LIMIT 1
                "#,
                params![transaction_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }
}
