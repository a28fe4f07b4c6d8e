//! Key/value settings

use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{DEFAULT_AUTO_APPLY_THRESHOLD, MAX_CONFIDENCE};
use crate::store::ThresholdSource;

/// Settings key holding the live auto-apply threshold
pub const AUTO_APPLY_THRESHOLD_KEY: &str = "auto_apply_threshold";

impl Database {
    /// Get a setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    /// Set a setting value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a setting
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM settings WHERE key = ?", params![key])?;
        Ok(())
    }

    /// The stored auto-apply threshold, or `fallback` when unset or unparsable
    pub fn auto_apply_threshold_or(&self, fallback: i32) -> Result<i32> {
        let Some(raw) = self.get_setting(AUTO_APPLY_THRESHOLD_KEY)? else {
            return Ok(fallback);
        };

        match raw.trim().parse::<i32>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(
                    "Ignoring unparsable {} setting '{}', using {}",
                    AUTO_APPLY_THRESHOLD_KEY, raw, fallback
                );
                Ok(fallback)
            }
        }
    }

    /// Store a new live auto-apply threshold (0-100)
    pub fn set_auto_apply_threshold(&self, threshold: i32) -> Result<()> {
        if !(0..=MAX_CONFIDENCE).contains(&threshold) {
            return Err(Error::Validation(format!(
                "Threshold {} is out of range (0-{})",
                threshold, MAX_CONFIDENCE
            )));
        }

        self.set_setting(AUTO_APPLY_THRESHOLD_KEY, &threshold.to_string())?;
        info!("Auto-apply threshold set to {}", threshold);
        Ok(())
    }
}

impl ThresholdSource for Database {
    fn auto_apply_threshold(&self) -> Result<i32> {
        self.auto_apply_threshold_or(DEFAULT_AUTO_APPLY_THRESHOLD)
    }
}

/// Live threshold from the settings table with a configured fallback
pub struct SettingsThreshold<'a> {
    db: &'a Database,
    fallback: i32,
}

impl<'a> SettingsThreshold<'a> {
    pub fn new(db: &'a Database, fallback: i32) -> Self {
        Self { db, fallback }
    }
}

impl ThresholdSource for SettingsThreshold<'_> {
    fn auto_apply_threshold(&self) -> Result<i32> {
        self.db.auto_apply_threshold_or(self.fallback)
    }
}
