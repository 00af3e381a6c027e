//! # Terminal Configuration
//!
//! Configuration for one terminal process.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COUNTER_DB_PATH=/srv/counter/counter.db                            │
//! │     COUNTER_TERMINAL_ID=till-2                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/counter-pos/counter.toml (Linux)                         │
//! │     ~/Library/Application Support/com.counter.pos/counter.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/counter/counter.db"
//! max_connections = 5
//!
//! [terminal]
//! id = "till-1"
//! name = "Front counter"
//!
//! [checkout]
//! price_policy = "reject_stale"  # reject_stale | captured
//!
//! [receipt]
//! paper_width = 32
//!
//! [inventory]
//! low_stock_threshold = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use counter_core::inventory::DEFAULT_LOW_STOCK_THRESHOLD;
use counter_core::receipt::DEFAULT_PAPER_WIDTH;

use crate::checkout::PricePolicy;
use crate::pool::DbConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "counter", "pos")
        .map(|dirs| dirs.data_dir().join("counter.db"))
        .unwrap_or_else(|| PathBuf::from("counter.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Identity of this terminal. `id` is recorded on every sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSettings {
    #[serde(default = "default_terminal_id")]
    pub id: String,

    #[serde(default = "default_terminal_name")]
    pub name: String,
}

fn default_terminal_id() -> String {
    "till-1".to_string()
}

fn default_terminal_name() -> String {
    "POS Terminal".to_string()
}

impl Default for TerminalSettings {
    fn default() -> Self {
        TerminalSettings {
            id: default_terminal_id(),
            name: default_terminal_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    #[serde(default)]
    pub price_policy: PricePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSettings {
    /// Characters per printed line.
    #[serde(default = "default_paper_width")]
    pub paper_width: usize,
}

fn default_paper_width() -> usize {
    DEFAULT_PAPER_WIDTH
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        ReceiptSettings {
            paper_width: default_paper_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub terminal: TerminalSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub receipt: ReceiptSettings,

    #[serde(default)]
    pub inventory: InventorySettings,
}

impl AppConfig {
    /// Loads configuration: file (if present), then environment, then
    /// validation.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.terminal.id.trim().is_empty() {
            return Err(ConfigError::Invalid("terminal.id must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if !(24..=80).contains(&self.receipt.paper_width) {
            return Err(ConfigError::Invalid(
                "receipt.paper_width must be between 24 and 80".into(),
            ));
        }
        if self.inventory.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "inventory.low_stock_threshold must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Pool configuration for the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("COUNTER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(id) = lookup("COUNTER_TERMINAL_ID") {
            debug!(terminal_id = %id, "Overriding terminal ID from environment");
            self.terminal.id = id;
        }

        if let Some(policy) = lookup("COUNTER_PRICE_POLICY") {
            match policy.parse() {
                Ok(parsed) => self.checkout.price_policy = parsed,
                Err(_) => warn!(policy = %policy, "Unknown price policy in environment"),
            }
        }

        if let Some(width) = lookup("COUNTER_PAPER_WIDTH") {
            match width.parse::<usize>() {
                Ok(w) => self.receipt.paper_width = w,
                Err(_) => warn!(width = %width, "Invalid paper width in environment"),
            }
        }

        if let Some(threshold) = lookup("COUNTER_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.inventory.low_stock_threshold = t,
                Err(_) => warn!(threshold = %threshold, "Invalid low stock threshold in environment"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "counter", "pos")
            .map(|dirs| dirs.config_dir().join("counter.toml"))
    }
}
