//! Backend collaborator: configuration, authentication, and key CRUD.
//!
//! The SDK core only talks to the backend through the [`Backend`] trait and
//! never holds its internal lock while a backend call is in flight. Two
//! implementations ship with the crate:
//!
//! - [`HttpBackend`]: blocking REST client for a real deployment.
//! - [`InMemoryBackend`]: in-process store for tests and offline use.

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

use common::{protocol::ConfigResponse, KeyOp, SdkError};
use thiserror::Error;

use crate::material::{KeyMaterial, SessionToken};

/// Errors reported by a backend implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached (connect, TLS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend answered but the body could not be understood.
    #[error("malformed backend response: {0}")]
    InvalidResponse(String),

    /// The request could not be built from the supplied arguments.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backend does not support the requested operation.
    #[error("unsupported by backend: {0}")]
    Unsupported(String),
}

impl From<BackendError> for SdkError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Transport(msg) => SdkError::Network(msg),
            BackendError::Api { status, message } => SdkError::BackendApi {
                status: Some(status),
                message,
            },
            BackendError::InvalidResponse(msg) => SdkError::BackendApi {
                status: None,
                message: msg,
            },
            BackendError::InvalidRequest(msg) => SdkError::InvalidArgument(msg),
            BackendError::Unsupported(msg) => SdkError::UnsupportedOperation(msg),
        }
    }
}

/// The remote key-management service as seen by the SDK.
///
/// Implementations apply their own timeout policy; the SDK does not cancel
/// calls. All methods may block.
pub trait Backend: Send + Sync {
    /// Exchange a registration token for the backend configuration.
    fn fetch_config(&self, registration_token: &str) -> Result<ConfigResponse, BackendError>;

    /// Authenticate and obtain a session token.
    fn authenticate(&self, identity: &str, secret: &str) -> Result<SessionToken, BackendError>;

    /// Perform a key operation. Only [`KeyOp::Read`] returns material.
    fn key_op(
        &self,
        token: &SessionToken,
        op: KeyOp,
        key_name: &str,
        key_data: Option<&[u8]>,
    ) -> Result<Option<KeyMaterial>, BackendError>;

    /// Release connections held by the backend. Called by `Sdk::cleanup`.
    fn close(&self) {}
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn fetch_config(&self, registration_token: &str) -> Result<ConfigResponse, BackendError> {
        (**self).fetch_config(registration_token)
    }

    fn authenticate(&self, identity: &str, secret: &str) -> Result<SessionToken, BackendError> {
        (**self).authenticate(identity, secret)
    }

    fn key_op(
        &self,
        token: &SessionToken,
        op: KeyOp,
        key_name: &str,
        key_data: Option<&[u8]>,
    ) -> Result<Option<KeyMaterial>, BackendError> {
        (**self).key_op(token, op, key_name, key_data)
    }

    fn close(&self) {
        (**self).close()
    }
}
