/// Degradation mode definitions
///
/// The mode is advice for callers about how much data to request per profile.
use serde::{Deserialize, Serialize};
use std::fmt;

/// How aggressively callers should scale back after rate-limit signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradationMode {
    /// No rate-limit signal today; fetch full profiles
    #[default]
    Normal,

    /// One rate-limit signal today; fetch a minimal subset of fields
    Reduced,

    /// Repeated rate-limit signals today; start no new operations until tomorrow
    Stopped,
}

impl DegradationMode {
    /// Returns true if callers may still start new operations today
    pub fn allows_new_operations(&self) -> bool {
        !matches!(self, Self::Stopped)
    }

    /// Returns true if callers should limit each operation to a minimal field set
    pub fn requests_minimal_fields(&self) -> bool {
        matches!(self, Self::Reduced)
    }

    /// Converts the mode to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Reduced => "reduced",
            Self::Stopped => "stopped",
        }
    }

    /// Parses a mode from its database string representation
    ///
    /// Returns None if the string doesn't match any known mode.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "reduced" => Some(Self::Reduced),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for DegradationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_new_operations() {
        assert!(DegradationMode::Normal.allows_new_operations());
        assert!(DegradationMode::Reduced.allows_new_operations());
        assert!(!DegradationMode::Stopped.allows_new_operations());
    }

    #[test]
    fn test_requests_minimal_fields() {
        assert!(!DegradationMode::Normal.requests_minimal_fields());
        assert!(DegradationMode::Reduced.requests_minimal_fields());
        assert!(!DegradationMode::Stopped.requests_minimal_fields());
    }

    #[test]
    fn test_db_strings_match_serde_names() {
        for mode in [
            DegradationMode::Normal,
            DegradationMode::Reduced,
            DegradationMode::Stopped,
        ] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.to_db_string()));
            assert_eq!(DegradationMode::from_db_string(mode.to_db_string()), Some(mode));
        }
    }

    #[test]
    fn test_from_db_string_invalid() {
        assert_eq!(DegradationMode::from_db_string("paused"), None);
        assert_eq!(DegradationMode::from_db_string("Normal"), None);
    }

    #[test]
    fn test_default_is_normal() {
        assert_eq!(DegradationMode::default(), DegradationMode::Normal);
        assert_eq!(DegradationMode::Stopped.to_string(), "stopped");
    }
}
