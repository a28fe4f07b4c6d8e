//! Configuration loading
//!
//! Resolution order: an explicit path, then
//! `~/.local/share/tally/config.toml`, then the embedded defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::DEFAULT_AUTO_APPLY_THRESHOLD;
use crate::store::ThresholdSource;

/// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database path
    pub database: PathBuf,
    /// User the CLI acts for
    pub user_id: i64,
    /// Fallback auto-apply threshold when the database has no live value
    pub auto_apply_threshold: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tally.db"),
            user_id: 1,
            auto_apply_threshold: DEFAULT_AUTO_APPLY_THRESHOLD,
        }
    }
}

/// Raw config structure for TOML parsing; every key is optional
#[derive(Debug, Deserialize)]
struct RawConfig {
    database: Option<PathBuf>,
    user_id: Option<i64>,
    auto_apply_threshold: Option<i32>,
}

impl Config {
    /// Load from the default location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit path. A missing file falls back to the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse config from TOML content; missing keys take default values
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let defaults = Self::default();
        Ok(Self {
            database: raw.database.unwrap_or(defaults.database),
            user_id: raw.user_id.unwrap_or(defaults.user_id),
            auto_apply_threshold: raw
                .auto_apply_threshold
                .unwrap_or(defaults.auto_apply_threshold),
        })
    }
}

impl ThresholdSource for Config {
    fn auto_apply_threshold(&self) -> Result<i32> {
        Ok(self.auto_apply_threshold)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// Load configuration (override first, then default location)
fn load_config(override_path: Option<&Path>) -> Result<Config> {
    let content = match override_path {
        Some(path) if path.exists() => {
            debug!("Loading config from {}", path.display());
            read_config(path)?
        }
        Some(_) => DEFAULT_CONFIG.to_string(),
        None => match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                read_config(&path)?
            }
            _ => DEFAULT_CONFIG.to_string(),
        },
    };

    Config::parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_default_config() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse("auto_apply_threshold = 75").unwrap();
        assert_eq!(config.auto_apply_threshold, 75);
        assert_eq!(config.user_id, 1);
        assert_eq!(config.database, PathBuf::from("tally.db"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::parse("user_id = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database = \"/tmp/books.db\"").unwrap();
        writeln!(file, "user_id = 42").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/books.db"));
        assert_eq!(config.user_id, 42);
        assert_eq!(config.auto_apply_threshold, DEFAULT_AUTO_APPLY_THRESHOLD);
    }

    #[test]
    fn test_missing_override_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_is_a_threshold_source() {
        let config = Config {
            auto_apply_threshold: 80,
            ..Config::default()
        };
        assert_eq!(config.auto_apply_threshold().unwrap(), 80);
    }
}
