//! Configuration module for Profile-Throttle
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use profile_throttle::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("throttle.toml")).unwrap();
//! println!("Minimum spacing: {}s", config.throttle.min_delay_seconds);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, StorageBackend, StorageConfig, ThrottleConfig, DEFAULT_DAILY_CAP,
    DEFAULT_MIN_DELAY_SECONDS, DEFAULT_RATE_LIMIT_WAIT_SECONDS,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
