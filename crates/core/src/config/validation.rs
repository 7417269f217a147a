//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` or `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `host_match` is neither "exact" nor "prefix"
    /// - `max_body_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.is_empty() {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must not be empty".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.origin) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: "must be an absolute http(s) URL".into(),
                });
            }
        }

        if self.host_match != "exact" && self.host_match != "prefix" {
            return Err(ConfigError::Invalid {
                field: "host_match".into(),
                reason: "must be \"exact\" or \"prefix\"".into(),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_body_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_body_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_body_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.critical_assets.is_empty() {
            tracing::warn!("critical_assets is empty; installation will cache nothing up front");
        }

        Ok(())
    }
}
