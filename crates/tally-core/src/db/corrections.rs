//! Correction audit log operations

use rusqlite::params;
use tracing::warn;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{AutoCategoryCorrection, CorrectionType, NewCorrection};
use crate::store::CorrectionLog;

impl Database {
    /// List a user's corrections, newest first
    pub fn list_corrections(&self, user_id: i64, limit: i64) -> Result<Vec<AutoCategoryCorrection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, transaction_id, original_category_id, corrected_category_id,
                   description, correction_type, confidence_at_correction, created_at
            FROM auto_category_corrections
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;

        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                let id: i64 = row.get(0)?;
                let type_str: String = row.get(6)?;
                let created_at_str: String = row.get(8)?;
                let correction_type = match type_str.parse::<CorrectionType>() {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("Skipping correction #{}: {}", id, e);
                        return Ok(None);
                    }
                };
                Ok(Some(AutoCategoryCorrection {
                    id,
                    user_id: row.get(1)?,
                    transaction_id: row.get(2)?,
                    original_category_id: row.get(3)?,
                    corrected_category_id: row.get(4)?,
                    description: row.get(5)?,
                    correction_type,
                    confidence_at_correction: row.get(7)?,
                    created_at: parse_datetime(&created_at_str),
                }))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let corrections = rows.into_iter().flatten().collect();

        Ok(corrections)
    }
}

impl CorrectionLog for Database {
    fn append_correction(&self, correction: &NewCorrection) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO auto_category_corrections
                (user_id, transaction_id, original_category_id, corrected_category_id,
                 description, correction_type, confidence_at_correction)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                correction.user_id,
                correction.transaction_id,
                correction.original_category_id,
                correction.corrected_category_id,
                correction.description,
                correction.correction_type.as_str(),
                correction.confidence_at_correction,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn correction_counts_by_type(&self, user_id: i64) -> Result<Vec<(CorrectionType, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT correction_type, COUNT(*)
            FROM auto_category_corrections
            WHERE user_id = ?
            GROUP BY correction_type
            "#,
        )?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut counts = Vec::with_capacity(rows.len());
        for (type_str, count) in rows {
            match type_str.parse::<CorrectionType>() {
                Ok(correction_type) => counts.push((correction_type, count)),
                Err(e) => warn!("Ignoring {} corrections: {}", count, e),
            }
        }

        Ok(counts)
    }
}
