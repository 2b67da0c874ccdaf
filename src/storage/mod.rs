//! Storage module for persisting rate-limit state
//!
//! This module holds the pluggable backends behind the coordinator:
//! - JSON files, one per account (default)
//! - SQLite, one row per account
//! - An in-memory map for single-process use and tests

mod json;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{StateStore, StorageError, StorageResult};

use crate::config::{StorageBackend, StorageConfig};
use crate::ThrottleError;

/// Opens the backend described by `config`
///
/// # Arguments
///
/// * `config` - The storage section of the configuration
///
/// # Returns
///
/// * `Ok(Box<dyn StateStore>)` - The opened backend
/// * `Err(ThrottleError)` - Failed to open the backend
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn StateStore>, ThrottleError> {
    let path = config.resolved_path();
    let store: Box<dyn StateStore> = match config.backend {
        StorageBackend::Json => Box::new(JsonFileStore::new(path)),
        StorageBackend::Sqlite => Box::new(SqliteStore::new(&path)?),
    };

    tracing::debug!("Opened rate-limit store {}", store.describe());
    Ok(store)
}
