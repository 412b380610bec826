//! Configuration module for Regis
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`ANTHROPIC_API_KEY`, `BACKEND_PORT`, `SAFE_MODE`, ...),
//!    including values loaded from `.env` / `.env.local`
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! The resulting [`RegisConfig`] is built once at startup and shared by
//! reference; request handlers never consult the environment.
//!
//! # Example
//!
//! ```rust
//! use regis::config::RegisConfig;
//!
//! let config = RegisConfig::default();
//! assert_eq!(config.server.port, 8000);
//!
//! let toml = r#"
//! [server]
//! port = 9000
//! "#;
//! let config: RegisConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```

pub mod error;
pub mod logging;
pub mod providers;
pub mod retry;
pub mod server;
pub mod sidecar;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use providers::{CredentialError, ProviderConfig, ProviderKind, ProvidersConfig};
pub use retry::{RetryConfig, RetryPolicyConfig};
pub use server::ServerConfig;
pub use sidecar::SidecarConfig;

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the Regis backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegisConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Hosted model providers and credentials
    pub providers: ProvidersConfig,
    /// Backoff policies for buffered provider calls
    pub retry: RetryConfig,
    /// Console and file logging
    pub logging: LoggingConfig,
    /// Command execution / filesystem sidecar
    pub sidecar: SidecarConfig,
}

/// Parse a boolean-ish environment value. Unrecognised values yield `None`.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl RegisConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Invalid values are silently ignored (the previous value is kept).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server settings
        for var in ["BACKEND_PORT", "REGIS_PORT"] {
            if let Some(port) = lookup(var).and_then(|p| p.trim().parse().ok()) {
                self.server.port = port;
            }
        }
        if let Some(host) = lookup("REGIS_HOST") {
            self.server.host = host;
        }

        // Credentials
        for kind in ProviderKind::ALL {
            if let Some(key) = lookup(kind.api_key_env()) {
                let key = key.trim().to_string();
                if !key.is_empty() {
                    self.providers.get_mut(kind).api_key = Some(key);
                }
            }
        }
        if let Some(provider) = lookup("DEFAULT_AI_PROVIDER").and_then(|p| p.parse().ok()) {
            self.providers.default_provider = provider;
        }

        // Logging settings
        if let Some(level) = lookup("REGIS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("REGIS_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            self.logging.format = format;
        }
        if let Some(enabled) = lookup("ENABLE_LOGGING").as_deref().and_then(parse_flag) {
            self.logging.enabled = enabled;
        }

        // Sidecar
        if let Some(safe) = lookup("SAFE_MODE").as_deref().and_then(parse_flag) {
            self.sidecar.safe_mode = safe;
        }

        self
    }

    /// Retry policy for buffered chat completions.
    pub fn chat_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry.chat)
    }

    /// Retry policy for prompt improvement.
    pub fn improve_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry.improve)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.providers.request_timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                field: "providers.request_timeout_seconds".to_string(),
                message: "timeout must be non-zero".to_string(),
            });
        }

        if self.sidecar.command_timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                field: "sidecar.command_timeout_seconds".to_string(),
                message: "timeout must be non-zero".to_string(),
            });
        }

        for (name, policy) in [("retry.chat", &self.retry.chat), ("retry.improve", &self.retry.improve)] {
            RetryPolicy::from(policy)
                .validate()
                .map_err(|message| ConfigError::Validation {
                    field: name.to_string(),
                    message,
                })?;
        }

        Ok(())
    }
}
