//! Session lifecycle and the lock over all shared SDK state.
//!
//! ```text
//! Uninitialised ──initialize──▶ Initialised ──create_session──▶ Session active
//!       ▲                            │                              │  ▲
//!       └──────────── cleanup ───────┴──────────────────────────────┘  └─ create_session (rotate)
//! ```
//!
//! [`SessionState`] wraps one [`Mutex`] around the [`SdkContext`] (flag,
//! token, backend configuration, key cache). Critical sections only copy
//! memory; backend calls always happen with the lock released.

use std::sync::{Mutex, MutexGuard, PoisonError};

use common::{protocol::ConfigResponse, SdkError};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::cache::KeyCache;
use crate::material::SessionToken;

/// Everything guarded by the session lock.
///
/// Invariant: `token` and `backend_config` are `Some` only while
/// `initialized` is `true`.
#[derive(Debug)]
pub struct SdkContext {
    initialized: bool,
    token: Option<SessionToken>,
    backend_config: Option<ConfigResponse>,
    cache: KeyCache,
}

impl SdkContext {
    fn new(cache_capacity: usize) -> Self {
        Self {
            initialized: false,
            token: None,
            backend_config: None,
            cache: KeyCache::new(cache_capacity),
        }
    }

    /// Zero every secret, then mark the context uninitialised.
    fn wipe(&mut self) {
        self.token = None;
        self.backend_config = None;
        self.cache.clear();
        self.initialized = false;
    }
}

/// Lifecycle state machine plus the shared key cache.
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<SdkContext>,
}

impl SessionState {
    /// Create an uninitialised session whose cache holds `cache_capacity` keys.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SdkContext::new(cache_capacity)),
        }
    }

    /// Acquire the lock. A poisoned lock is recovered: every critical
    /// section leaves the context structurally valid.
    fn lock(&self) -> MutexGuard<'_, SdkContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `initialize` has succeeded and `cleanup` has not run since.
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Whether a session token is currently stored.
    pub fn has_session(&self) -> bool {
        self.lock().token.is_some()
    }

    /// Configuration fetched during `initialize`.
    pub fn backend_config(&self) -> Option<ConfigResponse> {
        self.lock().backend_config.clone()
    }

    /// Fail with [`SdkError::NotInitialized`] unless initialised.
    pub fn require_initialized(&self) -> Result<(), SdkError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SdkError::NotInitialized)
        }
    }

    /// Register with the backend and transition to *initialised*.
    ///
    /// # Errors
    ///
    /// - [`SdkError::AlreadyInitialized`] if already initialised (checked
    ///   before and after the backend call).
    /// - [`SdkError::InvalidArgument`] if `registration_token` is empty.
    /// - The backend's error, converted, if the configuration fetch fails;
    ///   the state stays uninitialised and the call may be retried.
    pub fn initialize<B: Backend + ?Sized>(
        &self,
        backend: &B,
        registration_token: &str,
    ) -> Result<(), SdkError> {
        if self.is_initialized() {
            return Err(SdkError::AlreadyInitialized);
        }
        if registration_token.is_empty() {
            return Err(SdkError::invalid_argument("registration token must not be empty"));
        }

        let config = backend.fetch_config(registration_token)?;

        let mut ctx = self.lock();
        if ctx.initialized {
            return Err(SdkError::AlreadyInitialized);
        }
        info!(
            api_version = %config.api_version,
            features = ?config.features,
            "SDK initialised"
        );
        ctx.backend_config = Some(config);
        ctx.token = None;
        ctx.initialized = true;
        Ok(())
    }

    /// Authenticate and publish the new session token, replacing any prior one.
    ///
    /// The token is visible to every thread before this returns.
    ///
    /// # Errors
    ///
    /// - [`SdkError::NotInitialized`] if not initialised.
    /// - [`SdkError::InvalidArgument`] if `identity` or `secret` is empty.
    /// - The backend's error, converted, if authentication fails.
    pub fn create_session<B: Backend + ?Sized>(
        &self,
        backend: &B,
        identity: &str,
        secret: &str,
    ) -> Result<SessionToken, SdkError> {
        self.require_initialized()?;
        if identity.is_empty() || secret.is_empty() {
            return Err(SdkError::invalid_argument("identity and secret are required"));
        }

        let token = backend.authenticate(identity, secret)?;

        let mut ctx = self.lock();
        if !ctx.initialized {
            // cleanup() ran while we were authenticating.
            return Err(SdkError::NotInitialized);
        }
        ctx.token = Some(token.clone());
        drop(ctx);

        info!(identity = %identity, "session established");
        Ok(token)
    }

    /// Copy out the current session token.
    ///
    /// # Errors
    ///
    /// [`SdkError::NotInitialized`] before `initialize`, [`SdkError::NoSession`]
    /// once initialised but before `create_session`.
    pub fn require_session(&self) -> Result<SessionToken, SdkError> {
        let ctx = self.lock();
        if !ctx.initialized {
            return Err(SdkError::NotInitialized);
        }
        ctx.token.clone().ok_or(SdkError::NoSession)
    }

    /// Run `f` with exclusive access to the key cache.
    ///
    /// `f` must only copy memory; never call the backend or a cipher from it.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut KeyCache) -> R) -> R {
        let mut ctx = self.lock();
        f(&mut ctx.cache)
    }

    /// Release the backend, zero the token and cache, and mark uninitialised.
    ///
    /// Idempotent: a no-op when not initialised. Must not race with other
    /// operations on the same instance.
    pub fn cleanup<B: Backend + ?Sized>(&self, backend: &B) {
        if !self.is_initialized() {
            debug!("cleanup on uninitialised SDK ignored");
            return;
        }
        backend.close();
        self.lock().wipe();
        info!("SDK cleaned up");
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(crate::cache::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    fn initialised() -> (SessionState, InMemoryBackend) {
        let state = SessionState::new(4);
        let backend = InMemoryBackend::new();
        state.initialize(&backend, "tok-1").unwrap();
        (state, backend)
    }

    #[test]
    fn starts_uninitialised() {
        let state = SessionState::default();
        assert!(!state.is_initialized());
        assert!(!state.has_session());
        assert_eq!(state.require_session().unwrap_err(), SdkError::NotInitialized);
    }

    #[test]
    fn initialize_fetches_config_once() {
        let (state, backend) = initialised();
        assert!(state.is_initialized());
        assert!(!state.has_session());
        assert_eq!(backend.config_count(), 1);
        assert_eq!(state.backend_config().unwrap().api_version, "1.0");
    }

    #[test]
    fn initialize_twice_fails() {
        let (state, backend) = initialised();
        assert_eq!(
            state.initialize(&backend, "tok-1").unwrap_err(),
            SdkError::AlreadyInitialized
        );
        assert_eq!(backend.config_count(), 1);
    }

    #[test]
    fn initialize_rejects_empty_token() {
        let state = SessionState::default();
        let backend = InMemoryBackend::new();
        assert!(matches!(
            state.initialize(&backend, ""),
            Err(SdkError::InvalidArgument(_))
        ));
        assert_eq!(backend.config_count(), 0);
    }

    #[test]
    fn failed_initialize_can_be_retried() {
        let state = SessionState::default();
        let backend = InMemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(
            state.initialize(&backend, "tok-1"),
            Err(SdkError::Network(_))
        ));
        assert!(!state.is_initialized());
        backend.set_offline(false);
        state.initialize(&backend, "tok-1").unwrap();
        assert!(state.is_initialized());
    }

    #[test]
    fn create_session_requires_initialisation() {
        let state = SessionState::default();
        let backend = InMemoryBackend::new();
        assert_eq!(
            state.create_session(&backend, "u", "p").unwrap_err(),
            SdkError::NotInitialized
        );
        assert_eq!(backend.auth_count(), 0);
    }

    #[test]
    fn create_session_rejects_missing_credentials() {
        let (state, backend) = initialised();
        assert!(matches!(
            state.create_session(&backend, "", "p"),
            Err(SdkError::InvalidArgument(_))
        ));
        assert!(matches!(
            state.create_session(&backend, "u", ""),
            Err(SdkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn require_session_before_and_after_login() {
        let (state, backend) = initialised();
        assert_eq!(state.require_session().unwrap_err(), SdkError::NoSession);
        let token = state.create_session(&backend, "u", "p").unwrap();
        assert_eq!(state.require_session().unwrap(), token);
    }

    #[test]
    fn create_session_rotates_token() {
        let (state, backend) = initialised();
        let first = state.create_session(&backend, "u", "p").unwrap();
        let second = state.create_session(&backend, "u", "p").unwrap();
        assert_ne!(first, second);
        assert_eq!(state.require_session().unwrap(), second);
    }

    #[test]
    fn rejected_login_keeps_previous_token() {
        let state = SessionState::new(2);
        let backend = InMemoryBackend::new().with_credentials("u", "p");
        state.initialize(&backend, "tok-1").unwrap();
        let token = state.create_session(&backend, "u", "p").unwrap();
        assert!(matches!(
            state.create_session(&backend, "u", "wrong"),
            Err(SdkError::BackendApi {
                status: Some(401),
                ..
            })
        ));
        assert_eq!(state.require_session().unwrap(), token);
    }

    #[test]
    fn cleanup_wipes_everything_and_is_idempotent() {
        let (state, backend) = initialised();
        state.create_session(&backend, "u", "p").unwrap();
        state.with_cache(|c| c.insert("K1", &[1u8; 32])).unwrap();

        state.cleanup(&backend);
        assert!(!state.is_initialized());
        assert!(!state.has_session());
        assert!(state.backend_config().is_none());
        assert!(state.with_cache(|c| c.is_empty()));
        assert_eq!(backend.close_count(), 1);

        state.cleanup(&backend);
        assert!(!state.is_initialized());
        assert_eq!(backend.close_count(), 1);
    }

    #[test]
    fn reinitialise_after_cleanup() {
        let (state, backend) = initialised();
        state.cleanup(&backend);
        state.initialize(&backend, "tok-1").unwrap();
        assert!(state.is_initialized());
        assert_eq!(state.require_session().unwrap_err(), SdkError::NoSession);
    }
}
