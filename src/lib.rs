//! Profile-Throttle: a persisted rate-limit and backoff coordinator
//!
//! This crate governs how often an automated collector may issue expensive
//! profile fetches against a single account. State is shared durably across
//! independent process runs, so a fresh run picks up the spacing, backoff,
//! daily cap, and degradation mode left behind by the previous one.

pub mod config;
pub mod coordinator;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Profile-Throttle operations
///
/// Coordinator operations never return this; it only surfaces while building
/// the pieces (loading configuration, opening a state store).
#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Profile-Throttle operations
pub type Result<T> = std::result::Result<T, ThrottleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, ThrottleConfig};
pub use coordinator::{Admission, Clock, Coordinator, ManualClock, SystemClock};
pub use state::{AccountKey, DegradationMode, RateLimitMetrics, RateLimitOutcome, RateLimitState};
pub use storage::{open_store, StateStore};
