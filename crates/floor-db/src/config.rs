//! # Floor Configuration
//!
//! Configuration for a floor installation.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FLOOR_DATABASE_PATH=/var/lib/floor/floor.db                        │
//! │     FLOOR_STORE_ID=store-001                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/floor-pos/floor.toml (Linux)                             │
//! │     ~/Library/Application Support/com.floor.pos/floor.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/floor/floor.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [store]
//! id = "store-001"
//!
//! [floor]
//! activity_report_limit = 50
//! kitchen_printer = "kitchen"
//! event_capacity = 256
//!
//! [logging]
//! filter = "info,floor_db=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use floor_core::{DEFAULT_ACTIVITY_REPORT_LIMIT, DEFAULT_STORE_ID};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_id")]
    pub id: String,
}

fn default_store_id() -> String {
    DEFAULT_STORE_ID.to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            id: default_store_id(),
        }
    }
}

/// Behavior of the floor repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorSettings {
    /// Entries returned by the activity report.
    #[serde(default = "default_report_limit")]
    pub activity_report_limit: i64,

    /// Print destination for new tickets.
    #[serde(default = "default_kitchen_printer")]
    pub kitchen_printer: String,

    /// Buffer of the notification fan-out channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_report_limit() -> i64 {
    DEFAULT_ACTIVITY_REPORT_LIMIT
}

fn default_kitchen_printer() -> String {
    "kitchen".to_string()
}

fn default_event_capacity() -> usize {
    256
}

impl Default for FloorSettings {
    fn default() -> Self {
        FloorSettings {
            activity_report_limit: default_report_limit(),
            kitchen_printer: default_kitchen_printer(),
            event_capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,floor_db=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Floor Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloorConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub floor: FloorSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl FloorConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (floor.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading floor config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections fall back to defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.id".into(),
                message: "must not be empty".into(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.floor.activity_report_limit <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "floor.activity_report_limit".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.floor.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "floor.event_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FLOOR_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(max) = std::env::var("FLOOR_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid FLOOR_MAX_CONNECTIONS"),
            }
        }

        if let Ok(ms) = std::env::var("FLOOR_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid FLOOR_BUSY_TIMEOUT_MS"),
            }
        }

        if let Ok(id) = std::env::var("FLOOR_STORE_ID") {
            self.store.id = id;
        }

        if let Ok(printer) = std::env::var("FLOOR_KITCHEN_PRINTER") {
            self.floor.kitchen_printer = printer;
        }

        if let Ok(filter) = std::env::var("FLOOR_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "floor", "pos")
            .map(|dirs| dirs.config_dir().join("floor.toml"))
    }

    /// Database file: configured path, else the platform data directory.
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "floor", "pos")
                .map(|dirs| dirs.data_dir().join("floor.db"))
                .unwrap_or_else(|| PathBuf::from("floor.db"))
        })
    }

    /// Pool configuration derived from the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FloorConfig::default();
        assert_eq!(config.store.id, DEFAULT_STORE_ID);
        assert_eq!(config.floor.activity_report_limit, 50);
        assert_eq!(config.floor.kitchen_printer, "kitchen");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FloorConfig::from_toml(
            r#"
            [store]
            id = "store-042"

            [floor]
            activity_report_limit = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.store.id, "store-042");
        assert_eq!(config.floor.activity_report_limit, 10);
        assert_eq!(config.floor.event_capacity, 256);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = FloorConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = FloorConfig::default();
        config.store.id = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let path = std::env::temp_dir().join(format!("floor-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[floor]\nkitchen_printer = \"grill\"\n").unwrap();

        let config = FloorConfig::load(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.floor.kitchen_printer, "grill");
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = FloorConfig::from_toml("[floor\nnope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_db_config_from_settings() {
        let mut config = FloorConfig::default();
        config.database.path = Some(PathBuf::from("/tmp/floor-test.db"));
        config.database.busy_timeout_ms = 250;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/floor-test.db"));
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }
}
