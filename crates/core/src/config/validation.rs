//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::policy::StrategyTable;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `app_origin` is not an http(s) URL
    /// - a namespace name is malformed or a kind is registered twice
    /// - a precache set or binding names an unregistered namespace kind
    ///
    /// Returns `ConfigError::Missing` if no namespaces are registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
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

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.install_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "install_concurrency".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.namespaces.is_empty() {
            return Err(ConfigError::Missing {
                field: "namespaces".into(),
                hint: "Register at least one namespace kind and version".into(),
            });
        }

        self.app_origin_url()?;
        let registry = self.registry()?;

        for set in &self.precache {
            if registry.current(&set.namespace).is_none() {
                return Err(ConfigError::Invalid {
                    field: "precache".into(),
                    reason: format!("namespace kind {:?} is not registered", set.namespace),
                });
            }
        }
        self.precache_assets()?;
        self.offline_document_url()?;

        let table = StrategyTable::from_config(self)
            .map_err(|e| ConfigError::Invalid { field: "bindings".into(), reason: e.to_string() })?;
        table
            .check(&registry)
            .map_err(|e| ConfigError::Invalid { field: "bindings".into(), reason: e.to_string() })?;

        let allowlisted = self.image_hosts.iter().chain(&self.api_hosts).chain(&self.font_hosts);
        let overlapping: Vec<&String> = allowlisted
            .filter(|host| self.bypass_hosts.iter().any(|b| b.eq_ignore_ascii_case(host)))
            .collect();
        if !overlapping.is_empty() {
            tracing::warn!(
                hosts = ?overlapping,
                "bypass_hosts overlap an allowlist; \
                 bypass takes precedence"
            );
        }

        Ok(())
    }
}
