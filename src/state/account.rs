//! Account key derivation
//!
//! Every process that refers to the same account must land on the same
//! persisted record, so session paths are canonicalized before use.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Longest key prefix written to logs
const LOG_KEY_LEN: usize = 48;

/// Identifies whose rate-limit record an operation applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey(String);

impl AccountKey {
    /// Sentinel used when no account identity is supplied
    pub const DEFAULT: &'static str = "default";

    /// Derives the key from a session file path
    ///
    /// Existing paths are canonicalized (symlinks resolved). Paths that do not
    /// exist yet are made absolute and normalized lexically, so `a/../s.json`
    /// and `s.json` still agree.
    pub fn from_session_path(path: &Path) -> Self {
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| absolutize(path));
        Self(resolved.to_string_lossy().into_owned())
    }

    /// Uses the session path when present, otherwise the default account
    pub fn for_session(path: Option<&Path>) -> Self {
        path.map(Self::from_session_path).unwrap_or_default()
    }

    /// Wraps an explicit account name
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            Self::default()
        } else {
            Self(name)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Key prefix suitable for log lines
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(LOG_KEY_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// File-system safe identifier derived from the key
    ///
    /// The default account maps to `default`; any other key maps to the first
    /// 16 hex characters of its SHA-256 digest.
    pub fn storage_id(&self) -> String {
        if self.is_default() {
            return Self::DEFAULT.to_string();
        }
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(digest)[..16].to_string()
    }
}

impl Default for AccountKey {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
