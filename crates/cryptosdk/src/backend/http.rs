//! Blocking REST client for the key-management backend.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{
    protocol::{ConfigResponse, ErrorResponse, KeyRequest, KeyResponse, LoginRequest, LoginResponse},
    KeyOp,
};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    Method, Url,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Backend, BackendError};
use crate::config::SdkConfig;
use crate::material::{KeyMaterial, SessionToken};

/// Header carrying the application registration token on `GET /config`.
pub const REGISTRATION_HEADER: &str = "X-Registration-Token";

/// [`Backend`] implementation over HTTPS.
///
/// Every request uses the timeout from [`SdkConfig::request_timeout_secs`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    /// Build a client for `api_endpoint` (e.g. `https://api.example-crypto.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidRequest`] for an unparseable endpoint and
    /// [`BackendError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(api_endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(api_endpoint)
            .map_err(|e| BackendError::InvalidRequest(format!("invalid api endpoint: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidRequest(format!(
                "api endpoint cannot be a base URL: {api_endpoint}"
            )));
        }
        let client = Client::builder()
            .user_agent(concat!("cryptosdk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    /// Build a client from an [`SdkConfig`].
    pub fn from_config(cfg: &SdkConfig) -> Result<Self, BackendError> {
        Self::new(&cfg.api_endpoint, cfg.request_timeout())
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidRequest("api endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn key_request(
        &self,
        method: Method,
        segments: &[&str],
        token: &SessionToken,
    ) -> Result<RequestBuilder, BackendError> {
        let url = self.url(segments)?;
        Ok(self.client.request(method, url).bearer_auth(token.as_str()))
    }
}

/// Send a request, mapping transport errors and non-2xx statuses.
fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    let response = builder
        .send()
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned()
        });
    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response
        .json::<T>()
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

fn encode_key(name: &str, op: KeyOp, key_data: Option<&[u8]>) -> Result<KeyRequest, BackendError> {
    let data = key_data
        .ok_or_else(|| BackendError::InvalidRequest(format!("{op} requires key material")))?;
    Ok(KeyRequest {
        name: name.to_owned(),
        material: STANDARD.encode(data),
    })
}

impl Backend for HttpBackend {
    fn fetch_config(&self, registration_token: &str) -> Result<ConfigResponse, BackendError> {
        let url = self.url(&["config"])?;
        debug!(url = %url, "fetching backend configuration");
        let response = send(
            self.client
                .get(url)
                .header(REGISTRATION_HEADER, registration_token),
        )?;
        decode_json(response)
    }

    fn authenticate(&self, identity: &str, secret: &str) -> Result<SessionToken, BackendError> {
        let url = self.url(&["auth", "login"])?;
        debug!(url = %url, identity = %identity, "authenticating");
        let body = LoginRequest {
            identity: identity.to_owned(),
            secret: secret.to_owned(),
        };
        let response = send(self.client.post(url).json(&body))?;
        let login: LoginResponse = decode_json(response)?;
        if login.token.is_empty() {
            return Err(BackendError::InvalidResponse("empty session token".into()));
        }
        Ok(SessionToken::new(login.token))
    }

    fn key_op(
        &self,
        token: &SessionToken,
        op: KeyOp,
        key_name: &str,
        key_data: Option<&[u8]>,
    ) -> Result<Option<KeyMaterial>, BackendError> {
        debug!(op = %op, key = %key_name, "backend key operation");
        match op {
            KeyOp::Create => {
                let body = encode_key(key_name, op, key_data)?;
                send(self.key_request(Method::POST, &["keys"], token)?.json(&body))?;
                Ok(None)
            }
            KeyOp::Read => {
                let response = send(self.key_request(Method::GET, &["keys", key_name], token)?)?;
                let key: KeyResponse = decode_json(response)?;
                let bytes = STANDARD
                    .decode(key.material.as_bytes())
                    .map_err(|e| BackendError::InvalidResponse(format!("key material: {e}")))?;
                Ok(Some(KeyMaterial::from(bytes)))
            }
            KeyOp::Update => {
                let body = encode_key(key_name, op, key_data)?;
                send(
                    self.key_request(Method::PUT, &["keys", key_name], token)?
                        .json(&body),
                )?;
                Ok(None)
            }
            KeyOp::Delete => {
                send(self.key_request(Method::DELETE, &["keys", key_name], token)?)?;
                Ok(None)
            }
        }
    }
}
