//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RECICLA_REMOTE_TIMEOUT_SECS=20                                     │
//! │     RECICLA_SYNC_ON_STARTUP=false                                      │
//! │     RECICLA_MAX_MALFORMED_ATTEMPTS=5                                   │
//! │     RECICLA_DB_PATH=/data/recicla.db                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/recicla/sync.toml (Linux)                                │
//! │     ~/Library/Application Support/com.recicla.app/sync.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remote credentials are NOT part of this file: they live in the settings
//! store so the UI can change them at runtime.
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [database]
//! path = "/data/recicla.db"
//!
//! [sync]
//! sync_on_startup = true
//! sync_on_reconnect = false
//! sync_on_credentials_change = false
//! max_malformed_attempts = 3
//!
//! [remote]
//! request_timeout_secs = 15
//! max_read_retries = 2
//! initial_backoff_ms = 200
//! max_backoff_secs = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

const ENV_REMOTE_TIMEOUT: &str = "RECICLA_REMOTE_TIMEOUT_SECS";
const ENV_SYNC_ON_STARTUP: &str = "RECICLA_SYNC_ON_STARTUP";
const ENV_MAX_MALFORMED: &str = "RECICLA_MAX_MALFORMED_ATTEMPTS";
const ENV_DB_PATH: &str = "RECICLA_DB_PATH";

const DB_FILE_NAME: &str = "recicla.db";

// =============================================================================
// Database Settings
// =============================================================================

/// Where the local SQLite file lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Explicit database path. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Sync Settings
// =============================================================================

/// When cycles start and how stubborn entries are treated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Run a cycle from `initialize()`.
    #[serde(default = "default_true")]
    pub sync_on_startup: bool,

    /// Run a cycle when connectivity comes back.
    #[serde(default)]
    pub sync_on_reconnect: bool,

    /// Run a cycle right after credentials are saved.
    #[serde(default)]
    pub sync_on_credentials_change: bool,

    /// Malformed-payload failures before an entry is quarantined.
    #[serde(default = "default_max_malformed_attempts")]
    pub max_malformed_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_malformed_attempts() -> u32 {
    3
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            sync_on_startup: true,
            sync_on_reconnect: false,
            sync_on_credentials_change: false,
            max_malformed_attempts: default_max_malformed_attempts(),
        }
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Deadlines and retry behavior of remote calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Deadline for every single remote call (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Extra attempts for idempotent reads (select / lookup).
    /// Writes are never retried inside a cycle; the outbox retries them.
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,

    /// Initial backoff between read retries (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff between read retries (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_request_timeout() -> u64 {
    15
}
fn default_max_read_retries() -> u32 {
    2
}
fn default_initial_backoff() -> u64 {
    200
}
fn default_max_backoff() -> u64 {
    5
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            request_timeout_secs: default_request_timeout(),
            max_read_retries: default_max_read_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub remote: RemoteSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.remote.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.sync.max_malformed_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_malformed_attempts must be greater than 0".into(),
            ));
        }

        if self.remote.initial_backoff_ms > self.remote.max_backoff_secs.saturating_mul(1000) {
            return Err(SyncError::InvalidConfig(
                "initial_backoff_ms must not exceed max_backoff_secs".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// [`SyncConfig::load`]). Unparseable values are ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_REMOTE_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) => {
                    debug!(secs, "Overriding remote timeout from environment");
                    self.remote.request_timeout_secs = secs;
                }
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_REMOTE_TIMEOUT),
            }
        }

        if let Some(raw) = lookup(ENV_SYNC_ON_STARTUP) {
            match parse_bool(&raw) {
                Some(flag) => self.sync.sync_on_startup = flag,
                None => warn!(value = %raw, "Ignoring invalid {}", ENV_SYNC_ON_STARTUP),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_MALFORMED) {
            match raw.parse::<u32>() {
                Ok(n) => self.sync.max_malformed_attempts = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_MAX_MALFORMED),
            }
        }

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database file path: configured, or `recicla.db` in the platform data
    /// directory, or the working directory as a last resort.
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
        })
    }

    /// Deadline for a single remote call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "recicla", "app")
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(config.sync.sync_on_startup);
        assert!(!config.sync.sync_on_reconnect);
        assert_eq!(config.sync.max_malformed_attempts, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.remote.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.remote.request_timeout_secs = 10;
        config.sync.max_malformed_attempts = 0;
        assert!(config.validate().is_err());

        config.sync.max_malformed_attempts = 1;
        config.remote.initial_backoff_ms = 10_000;
        config.remote.max_backoff_secs = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_REMOTE_TIMEOUT, "30"),
            (ENV_SYNC_ON_STARTUP, "off"),
            (ENV_MAX_MALFORMED, "not-a-number"),
            (ENV_DB_PATH, "/tmp/recicla-test.db"),
        ]);

        let mut config = SyncConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.remote.request_timeout_secs, 30);
        assert!(!config.sync.sync_on_startup);
        assert_eq!(config.sync.max_malformed_attempts, 3);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/recicla-test.db"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [remote]
            request_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.request_timeout_secs, 5);
        assert_eq!(config.remote.max_read_retries, 2);
        assert!(config.sync.sync_on_startup);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!("recicla-sync-{}.toml", std::process::id()));

        let mut config = SyncConfig::default();
        config.sync.sync_on_reconnect = true;
        config.remote.max_read_retries = 0;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[sync]"));
        let loaded: SyncConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).unwrap();
    }
}
