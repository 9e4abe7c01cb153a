//! Request guards and the timeouts applied by the router.

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::debug;

use super::handlers::ApiError;
use super::state::AppState;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the application registration token on `GET /v1/config`.
pub const REGISTRATION_HEADER: &str = "x-registration-token";

/// Check the registration token header against the configured value.
pub fn require_registration(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(REGISTRATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing registration token"))?;
    if presented != state.settings.registration_token.as_str() {
        return Err(ApiError::unauthorized("registration token rejected"));
    }
    Ok(())
}

/// Verify the `Authorization: Bearer` token and return the caller's identity.
pub fn require_bearer(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    state.signer.verify(token.trim()).map_err(|e| {
        debug!(error = %e, "bearer token rejected");
        ApiError::unauthorized("invalid or expired token")
    })
}
