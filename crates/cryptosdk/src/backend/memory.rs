//! [`InMemoryBackend`]: an in-process key-management backend.
//!
//! Behaves like the REST service (create conflicts, missing keys, token
//! checks) without a network. Per-operation call counters let tests assert
//! how often the SDK reached the backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::{protocol::ConfigResponse, KeyOp};
use zeroize::Zeroizing;

use super::{Backend, BackendError};
use crate::crypto;
use crate::material::{KeyMaterial, SessionToken};

#[derive(Default)]
struct OpCounters {
    fetch_config: AtomicUsize,
    authenticate: AtomicUsize,
    create: AtomicUsize,
    read: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    close: AtomicUsize,
}

impl OpCounters {
    fn for_op(&self, op: KeyOp) -> &AtomicUsize {
        match op {
            KeyOp::Create => &self.create,
            KeyOp::Read => &self.read,
            KeyOp::Update => &self.update,
            KeyOp::Delete => &self.delete,
        }
    }
}

/// Thread-safe in-memory backend.
///
/// By default any non-empty registration token and credentials are accepted.
/// Use the `with_*` builders to require specific values or to seed keys.
///
/// Issued session tokens never expire and are kept for the lifetime of the
/// backend, one entry per `authenticate` call.
#[derive(Default)]
pub struct InMemoryBackend {
    registration_token: Option<String>,
    credentials: Option<(String, String)>,
    latency: Option<Duration>,
    offline: AtomicBool,
    keys: Mutex<HashMap<String, Zeroizing<Vec<u8>>>>,
    issued: Mutex<HashSet<String>>,
    next_token: AtomicU64,
    calls: OpCounters,
}

impl InMemoryBackend {
    /// Create an empty backend that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require this exact registration token in `fetch_config`.
    pub fn with_registration_token(mut self, token: impl Into<String>) -> Self {
        self.registration_token = Some(token.into());
        self
    }

    /// Require this identity / secret pair in `authenticate`.
    pub fn with_credentials(mut self, identity: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some((identity.into(), secret.into()));
        self
    }

    /// Seed a key.
    pub fn with_key(self, name: impl Into<String>, material: &[u8]) -> Self {
        self.lock_keys()
            .insert(name.into(), Zeroizing::new(material.to_vec()));
        self
    }

    /// Sleep this long inside every call, to widen race windows in tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Simulate the backend becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `key_op` calls made with `op`.
    pub fn op_count(&self, op: KeyOp) -> usize {
        self.calls.for_op(op).load(Ordering::SeqCst)
    }

    /// Number of `fetch_config` calls.
    pub fn config_count(&self) -> usize {
        self.calls.fetch_config.load(Ordering::SeqCst)
    }

    /// Number of `authenticate` calls.
    pub fn auth_count(&self) -> usize {
        self.calls.authenticate.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.calls.close.load(Ordering::SeqCst)
    }

    /// Whether a key with `name` is stored.
    pub fn contains_key(&self, name: &str) -> bool {
        self.lock_keys().contains_key(name)
    }

    fn lock_keys(&self) -> MutexGuard<'_, HashMap<String, Zeroizing<Vec<u8>>>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn simulate_network(&self) -> Result<(), BackendError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("backend unreachable".into()));
        }
        Ok(())
    }

    fn check_token(&self, token: &SessionToken) -> Result<(), BackendError> {
        let issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        if issued.contains(token.as_str()) {
            Ok(())
        } else {
            Err(BackendError::Api {
                status: 401,
                message: "invalid or expired token".into(),
            })
        }
    }
}

fn not_found(name: &str) -> BackendError {
    BackendError::Api {
        status: 404,
        message: format!("key not found: {name}"),
    }
}

fn require_data(op: KeyOp, key_data: Option<&[u8]>) -> Result<&[u8], BackendError> {
    key_data.ok_or_else(|| BackendError::InvalidRequest(format!("{op} requires key material")))
}

impl Backend for InMemoryBackend {
    fn fetch_config(&self, registration_token: &str) -> Result<ConfigResponse, BackendError> {
        self.calls.fetch_config.fetch_add(1, Ordering::SeqCst);
        self.simulate_network()?;

        let accepted = match &self.registration_token {
            Some(expected) => expected == registration_token,
            None => !registration_token.is_empty(),
        };
        if !accepted {
            return Err(BackendError::Api {
                status: 401,
                message: "registration token rejected".into(),
            });
        }

        Ok(ConfigResponse {
            api_version: "1.0".into(),
            features: crypto::registry()
                .iter()
                .map(|spec| spec.algorithm_id.to_owned())
                .collect(),
        })
    }

    fn authenticate(&self, identity: &str, secret: &str) -> Result<SessionToken, BackendError> {
        self.calls.authenticate.fetch_add(1, Ordering::SeqCst);
        self.simulate_network()?;

        let accepted = match &self.credentials {
            Some((id, pw)) => id == identity && pw == secret,
            None => !identity.is_empty() && !secret.is_empty(),
        };
        if !accepted {
            return Err(BackendError::Api {
                status: 401,
                message: "invalid credentials".into(),
            });
        }

        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("mem-token-{identity}-{n}");
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone());
        Ok(SessionToken::new(token))
    }

    fn key_op(
        &self,
        token: &SessionToken,
        op: KeyOp,
        key_name: &str,
        key_data: Option<&[u8]>,
    ) -> Result<Option<KeyMaterial>, BackendError> {
        self.calls.for_op(op).fetch_add(1, Ordering::SeqCst);
        self.simulate_network()?;
        self.check_token(token)?;

        let mut keys = self.lock_keys();
        match op {
            KeyOp::Create => {
                let data = require_data(op, key_data)?;
                if keys.contains_key(key_name) {
                    return Err(BackendError::Api {
                        status: 409,
                        message: format!("key already exists: {key_name}"),
                    });
                }
                keys.insert(key_name.to_owned(), Zeroizing::new(data.to_vec()));
                Ok(None)
            }
            KeyOp::Read => keys
                .get(key_name)
                .map(|material| Some(KeyMaterial::from_slice(material)))
                .ok_or_else(|| not_found(key_name)),
            KeyOp::Update => {
                let data = require_data(op, key_data)?;
                let slot = keys.get_mut(key_name).ok_or_else(|| not_found(key_name))?;
                *slot = Zeroizing::new(data.to_vec());
                Ok(None)
            }
            KeyOp::Delete => keys
                .remove(key_name)
                .map(|_| None)
                .ok_or_else(|| not_found(key_name)),
        }
    }

    fn close(&self) {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
    }
}
