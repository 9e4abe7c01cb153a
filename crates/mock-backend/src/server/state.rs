//! Shared application state injected into every Axum handler.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::auth::TokenSigner;
use crate::config::Config;
use crate::store::KeyStore;

/// Algorithms advertised by `GET /v1/config`.
pub const FEATURES: &[&str] = &["AES-128-GCM", "AES-256-GCM", "AES-256-GCM-SIV"];

/// Static settings every handler reads.
pub struct Settings {
    pub registration_token: Zeroizing<String>,
    pub identity: String,
    pub secret: Zeroizing<String>,
    pub api_version: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("identity", &self.identity)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Application state shared across all request handlers.
///
/// All fields are `Arc`-backed, so Axum can clone the state per request.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Key material, per owning identity.
    pub store: KeyStore,
    /// Issues and verifies bearer tokens.
    pub signer: Arc<TokenSigner>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: KeyStore, signer: TokenSigner, settings: Settings) -> Self {
        Self {
            store,
            signer: Arc::new(signer),
            settings: Arc::new(settings),
        }
    }

    /// Build state with an empty store from validated configuration.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            KeyStore::new(),
            TokenSigner::new(cfg.signing_key.as_bytes(), cfg.token_ttl()),
            Settings {
                registration_token: Zeroizing::new(cfg.registration_token.clone()),
                identity: cfg.identity.clone(),
                secret: Zeroizing::new(cfg.secret.clone()),
                api_version: cfg.api_version.clone(),
            },
        )
    }
}

impl Default for AppState {
    /// State accepting registration token `tok-1` and credentials `u` / `p`,
    /// suitable for tests.
    fn default() -> Self {
        Self::new(
            KeyStore::new(),
            TokenSigner::new(b"mock-backend-test-signing-key", Duration::from_secs(3600)),
            Settings {
                registration_token: Zeroizing::new("tok-1".into()),
                identity: "u".into(),
                secret: Zeroizing::new("p".into()),
                api_version: "1.0".into(),
            },
        )
    }
}
