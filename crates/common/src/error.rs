//! SDK error taxonomy returned across the public operation surface.

use thiserror::Error;

/// Convenience alias used throughout the SDK.
pub type Result<T, E = SdkError> = std::result::Result<T, E>;

/// Every failure a public SDK operation can report.
///
/// Each variant carries a stable numeric code (see [`SdkError::status_code`])
/// so that a C-compatible shim can surface the same values as the C
/// `SDK_STATUS` enumeration:
/// - [`SdkError::NotInitialized`] → -2
/// - [`SdkError::AlreadyInitialized`] → -3
/// - [`SdkError::InvalidArgument`] → -4
/// - [`SdkError::Network`] → -5
/// - [`SdkError::BackendApi`] → -6
/// - [`SdkError::Crypto`] → -7
/// - [`SdkError::BufferTooSmall`] → -8
/// - [`SdkError::NoSession`] → -9
/// - [`SdkError::KeyNotFound`] → -10
/// - [`SdkError::UnsupportedOperation`] → -11
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    /// An operation was attempted before `initialize` succeeded.
    #[error("SDK is not initialised")]
    NotInitialized,

    /// `initialize` was called on an instance that is already initialised.
    #[error("SDK is already initialised")]
    AlreadyInitialized,

    /// A caller-supplied argument was empty or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The backend was reached but rejected the request.
    #[error("backend rejected request{}: {message}", status_suffix(.status))]
    BackendApi {
        /// HTTP-style status returned by the backend, when one is known.
        status: Option<u16>,
        /// Description safe to show to callers.
        message: String,
    },

    /// A cipher operation failed, or key material has the wrong length.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The caller's output buffer cannot hold the result.
    #[error("output buffer too small: {required} bytes required")]
    BufferTooSmall {
        /// Exact number of bytes the result needs.
        required: usize,
    },

    /// No session token has been established with `create_session`.
    #[error("no active session, call create_session first")]
    NoSession,

    /// The named key could not be resolved from cache or backend.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Unknown algorithm or key operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl SdkError {
    /// Returns the numeric status code for this error.
    pub fn status_code(&self) -> i32 {
        match self {
            SdkError::NotInitialized => -2,
            SdkError::AlreadyInitialized => -3,
            SdkError::InvalidArgument(_) => -4,
            SdkError::Network(_) => -5,
            SdkError::BackendApi { .. } => -6,
            SdkError::Crypto(_) => -7,
            SdkError::BufferTooSmall { .. } => -8,
            SdkError::NoSession => -9,
            SdkError::KeyNotFound(_) => -10,
            SdkError::UnsupportedOperation(_) => -11,
        }
    }

    /// Shorthand for [`SdkError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SdkError::InvalidArgument(msg.into())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}
