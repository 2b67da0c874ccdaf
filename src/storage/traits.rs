//! Storage traits and error types
//!
//! This module defines the trait interface for rate-limit state backends and
//! associated error types.

use crate::state::{AccountKey, RateLimitState};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for rate-limit state backends
///
/// A backend holds exactly one record per account key. Loads and saves move
/// whole records; there is no partial update and no locking across calls, so
/// concurrent writers race with last-writer-wins semantics.
pub trait StateStore: Send {
    /// Loads the record for `account`
    ///
    /// Returns `Ok(None)` when the account has never been written.
    fn load(&self, account: &AccountKey) -> StorageResult<Option<RateLimitState>>;

    /// Replaces the record for `account`
    fn save(&mut self, account: &AccountKey, state: &RateLimitState) -> StorageResult<()>;

    /// Human-readable location of the backing data, for log lines
    fn describe(&self) -> String;
}
