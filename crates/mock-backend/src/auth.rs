//! HMAC-signed session tokens.
//!
//! Format: `<identity>.<expiry unix secs>.<base64url(HMAC-SHA256(identity.expiry))>`.
//! The identity may itself contain dots; the last two segments are parsed
//! from the right.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a bearer token is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("signing key rejected by HMAC")]
    InvalidKey,
}

/// Issues and verifies session tokens with a shared HMAC key.
pub struct TokenSigner {
    key: Zeroizing<Vec<u8>>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(key: &[u8], ttl: Duration) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
            ttl,
        }
    }

    /// Issue a token for `identity` valid for the signer's TTL from now.
    pub fn issue(&self, identity: &str) -> Result<String, AuthError> {
        self.issue_at(identity, unix_now())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, identity: &str, now: u64) -> Result<String, AuthError> {
        let expiry = now.saturating_add(self.ttl.as_secs());
        let payload = format!("{identity}.{expiry}");
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let sig = mac.finalize().into_bytes();
        Ok(format!("{payload}.{}", URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Verify `token` and return the identity it was issued to.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.verify_at(token, unix_now())
    }

    /// Verify `token` as if the current time were `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: u64) -> Result<String, AuthError> {
        let (payload, sig_b64) = token.rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (identity, expiry) = payload.rsplit_once('.').ok_or(AuthError::Malformed)?;
        if identity.is_empty() {
            return Err(AuthError::Malformed);
        }
        let expiry: u64 = expiry.parse().map_err(|_| AuthError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| AuthError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| AuthError::BadSignature)?;

        if now >= expiry {
            return Err(AuthError::Expired);
        }
        Ok(identity.to_owned())
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| AuthError::InvalidKey)
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
