use crate::config::types::{Config, StorageConfig, ThrottleConfig};
use crate::ConfigError;

/// Longest spacing we accept between two operations (one day)
const MAX_MIN_DELAY_SECONDS: u64 = 86_400;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_throttle_config(&config.throttle)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates pacing configuration
fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if config.min_delay_seconds > MAX_MIN_DELAY_SECONDS {
        return Err(ConfigError::Validation(format!(
            "min_delay_seconds must be <= {}, got {}",
            MAX_MIN_DELAY_SECONDS, config.min_delay_seconds
        )));
    }

    if config.daily_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "daily_cap must be >= 1, got {}",
            config.daily_cap
        )));
    }

    if config.rate_limit_wait_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_wait_seconds must be >= 1, got {}",
            config.rate_limit_wait_seconds
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
