//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};
use crate::store::TransactionSource;

const TRANSACTION_COLUMNS: &str =
    "id, user_id, date, description, amount, category_id, created_at";

impl Database {
    /// Insert a transaction
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (user_id, date, description, amount, category_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                tx.user_id,
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.category_id,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;

        Ok(tx)
    }

    /// List a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: i64,
        uncategorized_only: bool,
        limit: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = ?1 AND (?2 = 0 OR category_id IS NULL)
            ORDER BY date DESC, id DESC
            LIMIT ?3
            "#,
            TRANSACTION_COLUMNS
        ))?;

        let txs = stmt
            .query_map(
                params![user_id, uncategorized_only, limit],
                Self::row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// Assign (or clear) a transaction's category
    pub fn set_transaction_category(&self, id: i64, category_id: Option<i64>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions SET category_id = ? WHERE id = ?",
            params![category_id, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Uncategorized transactions for a user dated within `[from, to]`
    pub fn list_uncategorized_between(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = ? AND category_id IS NULL AND date >= ? AND date <= ?
            ORDER BY date, id
            "#,
            TRANSACTION_COLUMNS
        ))?;

        let txs = stmt
            .query_map(
                params![user_id, from.to_string(), to.to_string()],
                Self::row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// Helper to convert a row to Transaction
    /// Column order: id, user_id, date, description, amount, category_id, created_at
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let created_at_str: String = row.get(6)?;
        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: parse_date(&date_str),
            description: row.get(3)?,
            amount: row.get(4)?,
            category_id: row.get(5)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

impl TransactionSource for Database {
    fn transaction(&self, id: i64) -> Result<Option<Transaction>> {
        self.get_transaction(id)
    }

    fn uncategorized_transactions(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        self.list_uncategorized_between(user_id, from, to)
    }

    fn category_name(&self, category_id: i64) -> Result<Option<String>> {
        Ok(self.get_category(category_id)?.map(|c| c.name))
    }
}
