//! Configuration loading and validation for the mock backend.
//!
//! All values are read from `MOCK_BACKEND_*` environment variables.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable prefix, e.g. `MOCK_BACKEND_LISTEN_PORT`.
pub const ENV_PREFIX: &str = "MOCK_BACKEND";

/// Validated mock backend configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// TCP port for the plain HTTP listener.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Token clients must present on `GET /v1/config`. **Required.**
    pub registration_token: String,

    /// HMAC-SHA256 key used to sign session tokens. **Required.**
    pub signing_key: String,

    /// The single identity accepted by `POST /v1/auth/login`.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Secret paired with `identity`. **Required.**
    pub secret: String,

    /// Session token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Version string reported by `GET /v1/config`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Tracing log level (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_identity() -> String {
    "app_user_01".into()
}
fn default_token_ttl() -> u64 {
    86_400
}
fn default_api_version() -> String {
    "1.0".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Minimum signing key length in bytes.
const MIN_SIGNING_KEY_LEN: usize = 16;

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build mock backend configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise mock backend configuration")?;

        c.validate()?;
        Ok(c)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.registration_token.trim().is_empty() {
            anyhow::bail!("MOCK_BACKEND_REGISTRATION_TOKEN is required and must not be empty");
        }
        if self.signing_key.len() < MIN_SIGNING_KEY_LEN {
            anyhow::bail!(
                "MOCK_BACKEND_SIGNING_KEY must be at least {MIN_SIGNING_KEY_LEN} bytes"
            );
        }
        if self.identity.trim().is_empty() {
            anyhow::bail!("MOCK_BACKEND_IDENTITY must not be empty");
        }
        if self.secret.is_empty() {
            anyhow::bail!("MOCK_BACKEND_SECRET is required and must not be empty");
        }
        if self.token_ttl_secs == 0 {
            anyhow::bail!("MOCK_BACKEND_TOKEN_TTL_SECS must be > 0");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_port", &self.listen_port)
            .field("registration_token", &"[REDACTED]")
            .field("signing_key", &"[REDACTED]")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("api_version", &self.api_version)
            .field("log_level", &self.log_level)
            .finish()
    }
}
