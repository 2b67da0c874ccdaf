use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default minimum spacing between profile operations, in seconds
pub const DEFAULT_MIN_DELAY_SECONDS: u64 = 15;

/// Default ceiling on profile operations per account per calendar day
pub const DEFAULT_DAILY_CAP: u32 = 100;

/// Default backoff applied on the first rate-limit signal of a day, in seconds
pub const DEFAULT_RATE_LIMIT_WAIT_SECONDS: u64 = 900;

/// Main configuration structure for Profile-Throttle
///
/// Every section and key is optional; a missing file or an empty one yields
/// the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub throttle: ThrottleConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-wide pacing defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum time between two profile operations on one account (seconds)
    #[serde(rename = "min-delay-seconds", default = "default_min_delay")]
    pub min_delay_seconds: u64,

    /// Maximum profile operations per account per calendar day
    #[serde(rename = "daily-cap", default = "default_daily_cap")]
    pub daily_cap: u32,

    /// Backoff used when a rate-limit signal carries no suggested wait (seconds)
    #[serde(rename = "rate-limit-wait-seconds", default = "default_rate_limit_wait")]
    pub rate_limit_wait_seconds: u64,
}

impl ThrottleConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_delay_seconds)
    }

    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait_seconds)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay_seconds: DEFAULT_MIN_DELAY_SECONDS,
            daily_cap: DEFAULT_DAILY_CAP,
            rate_limit_wait_seconds: DEFAULT_RATE_LIMIT_WAIT_SECONDS,
        }
    }
}

/// Which persistence backend holds the rate-limit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per account inside a directory
    #[default]
    Json,
    /// One row per account in a SQLite database
    Sqlite,
}

/// Persistence configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory (json) or database file (sqlite); backend default when absent
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolves the on-disk location, falling back to the backend's default
    pub fn resolved_path(&self) -> PathBuf {
        match (&self.path, self.backend) {
            (Some(path), _) => PathBuf::from(path),
            (None, StorageBackend::Json) => PathBuf::from(".rate_limit_state"),
            (None, StorageBackend::Sqlite) => PathBuf::from(".rate_limit_state.db"),
        }
    }
}

fn default_min_delay() -> u64 {
    DEFAULT_MIN_DELAY_SECONDS
}

fn default_daily_cap() -> u32 {
    DEFAULT_DAILY_CAP
}

fn default_rate_limit_wait() -> u64 {
    DEFAULT_RATE_LIMIT_WAIT_SECONDS
}
