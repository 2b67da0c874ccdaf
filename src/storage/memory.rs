//! In-memory storage for single-process use and tests.
//!
//! Clones share one map, so two coordinators built from clones of the same
//! store behave like two processes pointed at the same state file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::state::{AccountKey, RateLimitState};
use crate::storage::traits::{StateStore, StorageResult};

/// Shared in-memory map of account records
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<AccountKey, RateLimitState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored record, bypassing the trait
    pub fn snapshot(&self, account: &AccountKey) -> Option<RateLimitState> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(account)
            .cloned()
    }

    /// Seeds a record directly, as if another process had written it
    pub fn insert(&self, account: AccountKey, state: RateLimitState) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(account, state);
    }
}

impl StateStore for MemoryStore {
    fn load(&self, account: &AccountKey) -> StorageResult<Option<RateLimitState>> {
        Ok(self.snapshot(account))
    }

    fn save(&mut self, account: &AccountKey, state: &RateLimitState) -> StorageResult<()> {
        self.insert(account.clone(), state.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
