//! Request and response types exchanged with the key-management backend.
//!
//! These types are serialised as JSON over the backend REST API. Key material
//! travels as standard base64 inside the `material` fields.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

// ---------------------------------------------------------------------------
// Key operations
// ---------------------------------------------------------------------------

/// A key management operation against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyOp {
    /// Store new key material under a name.
    Create,
    /// Fetch the key material for a name.
    Read,
    /// Replace the key material for an existing name.
    Update,
    /// Remove a key.
    Delete,
}

impl KeyOp {
    /// Canonical upper-case name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOp::Create => "CREATE",
            KeyOp::Read => "READ",
            KeyOp::Update => "UPDATE",
            KeyOp::Delete => "DELETE",
        }
    }

    /// Whether the operation carries key material in the request.
    pub fn requires_data(&self) -> bool {
        matches!(self, KeyOp::Create | KeyOp::Update)
    }
}

impl fmt::Display for KeyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyOp {
    type Err = SdkError;

    /// Parses `CREATE`, `READ`, `UPDATE` or `DELETE`, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [KeyOp::Create, KeyOp::Read, KeyOp::Update, KeyOp::Delete]
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SdkError::UnsupportedOperation(format!("key operation `{s}`")))
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Response body for `GET /config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Backend API version string.
    pub api_version: String,
    /// Algorithm identifiers the backend advertises.
    #[serde(default)]
    pub features: Vec<String>,
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// User or application identity.
    pub identity: String,
    /// Secret for `identity`.
    pub secret: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Response body for `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent key requests.
    pub token: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginResponse { token: [REDACTED] }")
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Request body for `POST /keys` and `PUT /keys/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequest {
    /// Key name.
    pub name: String,
    /// Base64-encoded key material.
    pub material: String,
}

/// Response body for `GET /keys/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResponse {
    /// Key name.
    pub name: String,
    /// Base64-encoded key material.
    pub material: String,
}

/// Response body for create, update and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatusResponse {
    /// Key name the operation applied to.
    pub name: String,
    /// `"created"`, `"updated"` or `"deleted"`.
    pub status: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"unauthorized"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall backend status, `"ok"` when serving.
    pub status: String,
    /// Number of keys currently stored across all identities.
    pub keys_stored: usize,
}
