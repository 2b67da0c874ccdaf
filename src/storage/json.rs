//! JSON file storage implementation
//!
//! Each account lives in its own file, `rate-limit-<storage id>.json`, inside
//! a state directory. Writes go to a per-process temporary file that is then
//! renamed over the target, so readers never observe a half-written record.

use crate::state::{AccountKey, RateLimitState};
use crate::storage::traits::{StateStore, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory of per-account JSON records
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`
    ///
    /// The directory is created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `account`
    pub fn path_for(&self, account: &AccountKey) -> PathBuf {
        self.dir
            .join(format!("rate-limit-{}.json", account.storage_id()))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, account: &AccountKey) -> StorageResult<Option<RateLimitState>> {
        let path = self.path_for(account);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: RateLimitState = serde_json::from_str(&content)?;
        tracing::trace!("Loaded rate-limit state from {}", path.display());
        Ok(Some(state))
    }

    fn save(&mut self, account: &AccountKey, state: &RateLimitState) -> StorageResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(account);
        let payload = serde_json::to_vec_pretty(state)?;

        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&temp_path, payload)?;
        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::trace!("Saved rate-limit state to {}", path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.dir.display())
    }
}
