//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `categories` - Category CRUD
//! - `transactions` - Transaction CRUD and uncategorized backlog queries
//! - `rules` - Explicit categorization rules, archiving, reordering
//! - `patterns` - Learned keyword patterns (upsert, penalize, reset)
//! - `corrections` - Append-only correction audit log
//! - `suggestions` - Suggestion log for analytics
//! - `settings` - Key/value settings (live auto-apply threshold)

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{info, warn};

use crate::error::{Error, Result};

mod categories;
mod corrections;
mod patterns;
mod rules;
mod settings;
mod suggestions;
mod transactions;

pub use settings::{SettingsThreshold, AUTO_APPLY_THRESHOLD_KEY};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"tally-salt-v1-fx";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Hex-encoded hash output is the SQLCipher raw key
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Unparsable stored timestamp '{}' ({}), using now", s, e);
            Utc::now()
        })
}

/// Parse a stored YYYY-MM-DD date
pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|e| {
        warn!("Unparsable stored date '{}' ({}), using {}", s, e, NaiveDate::default());
        NaiveDate::default()
    })
}

/// Format a timestamp the way SQLite's CURRENT_TIMESTAMP does
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Whether connections are opened with a SQLCipher key
    encrypted: bool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `TALLY_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `TALLY_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `TALLY_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let encrypted = passphrase.is_some();
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Every pooled connection gets the key and a busy timeout
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(pragma) = &key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool, encrypted };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise get its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir()
            .join(format!("tally_test_{}_{}.db", std::process::id(), id))
            .to_string_lossy()
            .to_string();

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database was opened with an encryption key
    pub fn is_encrypted(&self) -> Result<bool> {
        if !self.encrypted {
            return Ok(false);
        }

        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the pattern writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Categories
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, name)
            );

            -- Transactions (only what categorization needs)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER,                           -- NULL = no owner, never categorized
                date DATE NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                category_id INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);

            -- Explicit rules, evaluated by priority ascending
            CREATE TABLE IF NOT EXISTS auto_category_rules (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                pattern TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                priority INTEGER NOT NULL DEFAULT 100,
                active BOOLEAN NOT NULL DEFAULT 1,
                archived BOOLEAN NOT NULL DEFAULT 0,       -- paused, kept for history
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_user_order
                ON auto_category_rules(user_id, active, archived, priority);

            -- Learned keyword patterns, one row per (user, keyword, category)
            CREATE TABLE IF NOT EXISTS learned_category_patterns (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                keyword TEXT NOT NULL,                     -- always lowercase
                category_id INTEGER NOT NULL,
                confidence INTEGER NOT NULL,               -- 0-100
                occurrence_count INTEGER NOT NULL DEFAULT 1,
                active BOOLEAN NOT NULL DEFAULT 1,
                first_learned_at DATETIME NOT NULL,
                last_matched_at DATETIME NOT NULL,
                UNIQUE(user_id, keyword, category_id)
            );

            CREATE INDEX IF NOT EXISTS idx_patterns_user_active
                ON learned_category_patterns(user_id, active, confidence);

            -- Correction audit log (append-only)
            CREATE TABLE IF NOT EXISTS auto_category_corrections (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                transaction_id INTEGER NOT NULL,
                original_category_id INTEGER,
                corrected_category_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                correction_type TEXT NOT NULL,             -- auto_to_manual, wrong_auto_choice, ...
                confidence_at_correction INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_corrections_user ON auto_category_corrections(user_id, correction_type);

            -- Suggestions shown to the user, for accept/reject analytics
            CREATE TABLE IF NOT EXISTS auto_category_suggestion_logs (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                transaction_id INTEGER NOT NULL,
                suggested_category_id INTEGER,
                confidence INTEGER NOT NULL,
                matched_keywords TEXT NOT NULL,            -- JSON array
                source TEXT,                               -- rule_exact, learned_keyword
                auto_applied BOOLEAN NOT NULL DEFAULT 0,
                outcome TEXT NOT NULL DEFAULT 'pending',   -- pending, accepted, rejected
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                resolved_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_suggestion_logs_tx ON auto_category_suggestion_logs(transaction_id);

            -- Key/value settings
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
