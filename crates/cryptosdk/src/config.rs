//! SDK configuration.
//!
//! Values come from `CRYPTOSDK_*` environment variables (see
//! [`SdkConfig::from_env`]) or from [`SdkConfig::default`].

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cache::DEFAULT_CAPACITY;

/// Environment variable prefix, e.g. `CRYPTOSDK_API_ENDPOINT`.
pub const ENV_PREFIX: &str = "CRYPTOSDK";

/// Validated SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SdkConfig {
    /// Base URL of the key-management backend.
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Maximum number of keys held in the local cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Per-request timeout (seconds) applied by the HTTP backend.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_endpoint() -> String {
    "https://api.example-crypto.com/v1".into()
}
fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_request_timeout() -> u64 {
    10
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            cache_capacity: default_cache_capacity(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl SdkConfig {
    /// Load and validate configuration from `CRYPTOSDK_*` environment variables.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build SDK configuration from environment")?;

        let c: SdkConfig = cfg
            .try_deserialize()
            .context("failed to deserialise SDK configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.api_endpoint.trim().is_empty() {
            anyhow::bail!("CRYPTOSDK_API_ENDPOINT must not be empty");
        }
        if self.cache_capacity == 0 {
            anyhow::bail!("CRYPTOSDK_CACHE_CAPACITY must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("CRYPTOSDK_REQUEST_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let cfg = SdkConfig::default();
        assert_eq!(cfg.api_endpoint, "https://api.example-crypto.com/v1");
        assert_eq!(cfg.cache_capacity, 10);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_endpoint() {
        let cfg = SdkConfig {
            api_endpoint: "  ".into(),
            ..SdkConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let cfg = SdkConfig {
            cache_capacity: 0,
            ..SdkConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = SdkConfig {
            request_timeout_secs: 0,
            ..SdkConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    // The only test in this crate that touches CRYPTOSDK_* variables.
    #[test]
    fn from_env_reads_overrides_and_defaults() {
        let vars = [
            ("CRYPTOSDK_API_ENDPOINT", "http://127.0.0.1:8080/v1"),
            ("CRYPTOSDK_CACHE_CAPACITY", "4"),
        ];
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        let loaded = SdkConfig::from_env();
        std::env::set_var("CRYPTOSDK_CACHE_CAPACITY", "0");
        let rejected = SdkConfig::from_env();
        for (k, _) in vars {
            std::env::remove_var(k);
        }

        let cfg = loaded.unwrap();
        assert_eq!(cfg.api_endpoint, "http://127.0.0.1:8080/v1");
        assert_eq!(cfg.cache_capacity, 4);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert!(rejected.is_err());
    }
}
