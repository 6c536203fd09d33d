//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tally_oracle::{PriceDefault, PriceDefaults};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Event input settings.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Seed prices for assets without an oracle.
    #[serde(default)]
    pub prices: Vec<PriceDefault>,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Database file name inside the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

/// Event input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// NDJSON file of decoded events. Empty = stdin.
    #[serde(default)]
    pub events_path: String,
    /// Stop at the first event that fails.
    #[serde(default = "default_true")]
    pub halt_on_error: bool,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// First block that earns points.
    #[serde(default)]
    pub leaderboard_start_block: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database_file() -> String {
    "tally.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            database_file: default_database_file(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            events_path: String::new(),
            halt_on_error: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the database path.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.database_file)
    }

    /// `None` reads events from stdin.
    pub fn events_path(&self) -> Option<PathBuf> {
        (!self.ingest.events_path.is_empty()).then(|| PathBuf::from(&self.ingest.events_path))
    }

    pub fn price_defaults(&self) -> PriceDefaults {
        PriceDefaults::from_entries(self.prices.iter().cloned())
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// `$TALLY_DATA_DIR`, else `~/.tally`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("TALLY_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".tally"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/tally"))
    }
}
