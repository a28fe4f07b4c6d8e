//! Auto-categorization rule operations

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::AutoCategoryRule;
use crate::store::{RuleRepository, RuleWriter};

const RULE_COLUMNS: &str =
    "id, user_id, pattern, category_id, priority, active, archived, created_at";

/// Spacing between priorities assigned by `reorder_rules`
const PRIORITY_STEP: i32 = 10;

impl Database {
    /// Create an active rule. The pattern is trimmed and must not be empty.
    pub fn create_rule(
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

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO auto_category_rules (user_id, pattern, category_id, priority)
            VALUES (?, ?, ?, ?)
            "#,
            params![user_id, pattern, category_id, priority],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a rule by ID
    pub fn get_rule(&self, id: i64) -> Result<Option<AutoCategoryRule>> {
        let conn = self.conn()?;

        let rule = conn
            .query_row(
                &format!("SELECT {} FROM auto_category_rules WHERE id = ?", RULE_COLUMNS),
                params![id],
                Self::row_to_rule,
            )
            .optional()?;

        Ok(rule)
    }

    /// List a user's rules in evaluation order
    pub fn list_rules(&self, user_id: i64, include_archived: bool) -> Result<Vec<AutoCategoryRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM auto_category_rules
            WHERE user_id = ?1 AND (?2 = 1 OR archived = 0)
            ORDER BY priority, id
            "#,
            RULE_COLUMNS
        ))?;

        let rules = stmt
            .query_map(params![user_id, include_archived], Self::row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Archive a rule (paused, kept for history)
    pub fn archive_rule(&self, id: i64) -> Result<()> {
        self.update_rule_flag(id, "archived", true)
    }

    /// Unarchive a rule
    pub fn unarchive_rule(&self, id: i64) -> Result<()> {
        self.update_rule_flag(id, "archived", false)
    }

    /// Enable or disable a rule
    pub fn set_rule_active(&self, id: i64, active: bool) -> Result<()> {
        self.update_rule_flag(id, "active", active)
    }

    fn update_rule_flag(&self, id: i64, column: &str, value: bool) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            &format!("UPDATE auto_category_rules SET {} = ? WHERE id = ?", column),
            params![value, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Change a single rule's priority
    pub fn update_rule_priority(&self, id: i64, priority: i32) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE auto_category_rules SET priority = ? WHERE id = ?",
            params![priority, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Reassign priorities so rules evaluate in `ordered_ids` order.
    ///
    /// Listed rules get priorities 10, 20, 30, ... in one transaction. Every
    /// rule is first staged at a distinct negative priority so no two listed
    /// rules share a priority at any point. Unlisted rules keep theirs.
    pub fn reorder_rules(&self, user_id: i64, ordered_ids: &[i64]) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(Error::Validation(format!(
                "Rule {} listed more than once",
                dup
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for id in ordered_ids {
            let owned: Option<i64> = tx
                .query_row(
                    "SELECT id FROM auto_category_rules WHERE id = ? AND user_id = ?",
                    params![id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            if owned.is_none() {
                return Err(Error::Validation(format!(
                    "Rule {} does not belong to user {}",
                    id, user_id
                )));
            }
        }

        for (index, id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE auto_category_rules SET priority = ? WHERE id = ?",
                params![-(index as i64 + 1), id],
            )?;
        }

        for (index, id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE auto_category_rules SET priority = ? WHERE id = ?",
                params![(index as i64 + 1) * i64::from(PRIORITY_STEP), id],
            )?;
        }

        tx.commit()?;

        info!("Reordered {} rules for user {}", ordered_ids.len(), user_id);
        Ok(())
    }

    /// Helper to convert a row to AutoCategoryRule
    /// Column order: id, user_id, pattern, category_id, priority, active, archived, created_at
    fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<AutoCategoryRule> {
        let created_at_str: String = row.get(7)?;
        Ok(AutoCategoryRule {
            id: row.get(0)?,
            user_id: row.get(1)?,
            pattern: row.get(2)?,
            category_id: row.get(3)?,
            priority: row.get(4)?,
            active: row.get(5)?,
            archived: row.get(6)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

impl RuleRepository for Database {
    fn active_rules_for(&self, user_id: i64) -> Result<Vec<AutoCategoryRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM auto_category_rules
            WHERE user_id = ? AND active = 1 AND archived = 0
            ORDER BY priority, id
            "#,
            RULE_COLUMNS
        ))?;

        let rules = stmt
            .query_map(params![user_id], Self::row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }
}

impl RuleWriter for Database {
    fn create_rule(
        &self,
        user_id: i64,
        pattern: &str,
        category_id: i64,
        priority: i32,
    ) -> Result<i64> {
        Database::create_rule(self, user_id, pattern, category_id, priority)
    }
}
