//! Axum request handlers for the key-management API.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::{
    ConfigResponse, ErrorResponse, HealthResponse, KeyRequest, KeyResponse, KeyStatusResponse,
    LoginRequest, LoginResponse,
};
use tracing::{info, warn};

use super::middleware::{require_bearer, require_registration};
use super::state::{AppState, FEATURES};
use crate::store::StoreError;

/// An error response: status plus an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(_) => Self::new(StatusCode::CONFLICT, "conflict", e.to_string()),
            StoreError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// `GET /v1/config`: requires the `X-Registration-Token` header.
pub async fn config(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<ConfigResponse>> {
    require_registration(&state, &headers)?;
    Ok(Json(ConfigResponse {
        api_version: state.settings.api_version.clone(),
        features: FEATURES.iter().map(|f| (*f).to_owned()).collect(),
    }))
}

/// `POST /v1/auth/login`: exchange identity and secret for a bearer token.
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    let settings = &state.settings;
    if req.identity != settings.identity || req.secret != settings.secret.as_str() {
        warn!(identity = %req.identity, "login rejected");
        return Err(ApiError::unauthorized("invalid credentials"));
    }
    let token = state.signer.issue(&req.identity).map_err(|e| {
        warn!(error = %e, "token signing failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "token signing failed")
    })?;
    info!(identity = %req.identity, "session issued");
    Ok(Json(LoginResponse { token }))
}

/// `POST /v1/keys`: store a new key for the caller.
pub async fn create_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<KeyRequest>,
) -> ApiResult<(StatusCode, Json<KeyStatusResponse>)> {
    let owner = require_bearer(&state, &headers)?;
    if req.name.is_empty() {
        return Err(ApiError::bad_request("key name must not be empty"));
    }
    let material = decode_material(&req.material)?;
    state.store.create(&owner, &req.name, material).await?;
    info!(owner = %owner, key = %req.name, "key created");
    Ok((StatusCode::CREATED, Json(status(req.name, "created"))))
}

/// `GET /v1/keys/:name`: return the caller's key material.
pub async fn read_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> ApiResult<Json<KeyResponse>> {
    let owner = require_bearer(&state, &headers)?;
    let material = state.store.read(&owner, &name).await?;
    Ok(Json(KeyResponse {
        material: STANDARD.encode(material.as_slice()),
        name,
    }))
}

/// `PUT /v1/keys/:name`: replace the material of an existing key.
pub async fn update_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(req): Json<KeyRequest>,
) -> ApiResult<Json<KeyStatusResponse>> {
    let owner = require_bearer(&state, &headers)?;
    if req.name != name {
        return Err(ApiError::bad_request("key name in body does not match path"));
    }
    let material = decode_material(&req.material)?;
    state.store.update(&owner, &name, material).await?;
    info!(owner = %owner, key = %name, "key updated");
    Ok(Json(status(name, "updated")))
}

/// `DELETE /v1/keys/:name`: remove a key.
pub async fn delete_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> ApiResult<Json<KeyStatusResponse>> {
    let owner = require_bearer(&state, &headers)?;
    state.store.delete(&owner, &name).await?;
    info!(owner = %owner, key = %name, "key deleted");
    Ok(Json(status(name, "deleted")))
}

/// `GET /health`: liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        keys_stored: state.store.len().await,
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "not_found",
        "the requested resource does not exist",
    )
}

fn decode_material(encoded: &str) -> ApiResult<Vec<u8>> {
    let material = STANDARD
        .decode(encoded)
        .map_err(|_| ApiError::bad_request("key material must be standard base64"))?;
    if material.is_empty() {
        return Err(ApiError::bad_request("key material must not be empty"));
    }
    Ok(material)
}

fn status(name: String, status: &str) -> KeyStatusResponse {
    KeyStatusResponse {
        name,
        status: status.into(),
    }
}
