//! Configuration management for flightplan.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightplan";

/// Extension for database files.
const DATABASE_FILE_EXTENSION: &str = "db";

/// Allowed shape of database and collection names.
const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static NAME_REGEX: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

/// Compiled [`NAME_PATTERN`], built on first use.
fn name_regex() -> Result<&'static Regex> {
    NAME_REGEX
        .get_or_init(|| Regex::new(NAME_PATTERN))
        .as_ref()
        .map_err(|e| Error::internal(format!("bad name pattern: {e}")))
}

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTPLAN_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flightplan/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Filing policy configuration.
    pub filing: FilingConfig,
}

/// Which document store backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Persistent `SQLite`-backed document store.
    #[default]
    Sqlite,
    /// In-process store; contents are lost on exit.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store backend.
    pub backend: StoreBackend,
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightplan/<database_name>.db`
    pub database_path: Option<PathBuf>,
    /// Logical database name.
    pub database_name: String,
    /// Collection holding flight plan documents.
    pub collection: String,
}

/// Policy applied when filing or amending a flight plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingConfig {
    /// Reject plans whose arrival time is earlier than their departure time.
    pub reject_inverted_times: bool,
    /// Require airport codes to be 3-4 uppercase letters or digits.
    pub validate_airport_codes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_path: None, // Will be resolved to default at runtime
            database_name: "airDb".to_string(),
            collection: "flight_plan".to_string(),
        }
    }
}

impl Default for FilingConfig {
    fn default() -> Self {
        Self {
            reject_inverted_times: true,
            validate_airport_codes: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTPLAN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let name_pattern = name_regex()?;

        for (key, value) in [
            ("database_name", &self.storage.database_name),
            ("collection", &self.storage.collection),
        ] {
            if !name_pattern.is_match(value) {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "{key} '{value}' must start with a letter or underscore and contain only letters, digits and underscores"
                    ),
                });
            }
        }

        if let Some(path) = &self.storage.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "database_path cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage.database_path.clone().unwrap_or_else(|| {
            Self::default_data_dir()
                .join(&self.storage.database_name)
                .with_extension(DATABASE_FILE_EXTENSION)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.backend, StoreBackend::Sqlite);
        assert!(config.filing.reject_inverted_times);
        assert!(config.filing.validate_airport_codes);
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert!(storage.database_path.is_none());
        assert_eq!(storage.database_name, "airDb");
        assert_eq!(storage.collection, "flight_plan");
    }

    #[test]
    fn test_store_backend_display() {
        assert_eq!(StoreBackend::Sqlite.to_string(), "sqlite");
        assert_eq!(StoreBackend::Memory.to_string(), "memory");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_collection() {
        let mut config = Config::default();
        config.storage.collection = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("collection"));
    }

    #[test]
    fn test_validate_bad_database_name() {
        let mut config = Config::default();
        config.storage.database_name = "air db; drop".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("database_name"));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::new());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("database_path"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("flightplan"));
        assert!(path.to_string_lossy().ends_with("airDb.db"));
    }

    #[test]
    fn test_database_path_follows_database_name() {
        let mut config = Config::default();
        config.storage.database_name = "training".to_string();

        assert!(config.database_path().to_string_lossy().ends_with("training.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/plans.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/plans.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flightplan"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_name_regex_compiled_once() {
        let first = name_regex().unwrap();
        assert!(std::ptr::eq(first, name_regex().unwrap()));
        assert!(first.is_match("flight_plan"));
        assert!(!first.is_match("flight-plan"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "flightplan_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[storage]\nbackend = \"memory\"\ncollection = \"plans\"\n\n[filing]\nreject_inverted_times = false\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.storage.backend, StoreBackend::Memory);
        assert_eq!(config.storage.collection, "plans");
        assert_eq!(config.storage.database_name, "airDb");
        assert!(!config.filing.reject_inverted_times);
        assert!(config.filing.validate_airport_codes);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_storage_config_deserialize() {
        let json = r#"{"backend": "memory", "collection": "archive"}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.backend, StoreBackend::Memory);
        assert_eq!(storage.collection, "archive");
        assert_eq!(storage.database_name, "airDb");
    }

    #[test]
    fn test_filing_config_serialize() {
        let filing = FilingConfig::default();
        let json = serde_json::to_string(&filing).unwrap();
        assert!(json.contains("reject_inverted_times"));
        assert!(json.contains("validate_airport_codes"));
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
