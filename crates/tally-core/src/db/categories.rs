//! Category operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Category;

impl Database {
    /// Create a category for a user
    pub fn create_category(&self, user_id: i64, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Category name cannot be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (user_id, name) VALUES (?, ?)",
            params![user_id, name],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a category by ID
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;

        let category = conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM categories WHERE id = ?",
                params![id],
                |row| {
                    let created_at_str: String = row.get(3)?;
                    Ok(Category {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;

        Ok(category)
    }

    /// List a user's categories by name
    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at FROM categories WHERE user_id = ? ORDER BY name",
        )?;

        let categories = stmt
            .query_map(params![user_id], |row| {
                let created_at_str: String = row.get(3)?;
                Ok(Category {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }
}
