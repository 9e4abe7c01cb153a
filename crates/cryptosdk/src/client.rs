//! [`Sdk`]: the public operation surface.

use common::{protocol::ConfigResponse, KeyOp, Result, SdkError};
use tracing::{debug, warn};

use crate::backend::{Backend, HttpBackend};
use crate::config::SdkConfig;
use crate::crypto::{self, CipherSpec, SealedPayload};
use crate::material::{KeyMaterial, SessionToken};
use crate::resolver::KeyResolver;
use crate::session::SessionState;

/// One SDK instance: a backend, a session, and a key cache.
///
/// `Sdk` is `Sync`; share it between threads by reference (or in an `Arc`).
/// Every operation except [`Sdk::cleanup`] may run concurrently.
#[derive(Debug)]
pub struct Sdk<B> {
    backend: B,
    session: SessionState,
    config: SdkConfig,
}

impl Sdk<HttpBackend> {
    /// Build an SDK talking to the REST backend at `config.api_endpoint`.
    ///
    /// # Errors
    ///
    /// [`SdkError::InvalidArgument`] if the configuration is invalid or the
    /// endpoint is not a usable base URL.
    pub fn from_config(config: SdkConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SdkError::InvalidArgument(e.to_string()))?;
        let backend = HttpBackend::from_config(&config)?;
        Ok(Self::new(backend, config))
    }
}

impl<B: Backend> Sdk<B> {
    /// Create an uninitialised SDK over `backend`.
    pub fn new(backend: B, config: SdkConfig) -> Self {
        Self {
            session: SessionState::new(config.cache_capacity),
            backend,
            config,
        }
    }

    /// Create an uninitialised SDK over `backend` with default configuration.
    pub fn with_backend(backend: B) -> Self {
        Self::new(backend, SdkConfig::default())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub fn has_session(&self) -> bool {
        self.session.has_session()
    }

    /// Configuration reported by the backend during [`Sdk::initialize`].
    pub fn backend_config(&self) -> Option<ConfigResponse> {
        self.session.backend_config()
    }

    /// Cached key names, earliest-inserted first.
    pub fn cached_key_names(&self) -> Vec<String> {
        self.session
            .with_cache(|cache| cache.names().map(str::to_owned).collect())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register with the backend using `registration_token`.
    ///
    /// # Errors
    ///
    /// [`SdkError::AlreadyInitialized`], [`SdkError::InvalidArgument`] for an
    /// empty token, or the backend's failure (the instance stays usable for
    /// a retry).
    pub fn initialize(&self, registration_token: &str) -> Result<()> {
        self.session.initialize(&self.backend, registration_token)
    }

    /// Release the backend and zero the session token and every cached key.
    ///
    /// Idempotent. Callers must ensure no other operation is in flight.
    pub fn cleanup(&self) {
        self.session.cleanup(&self.backend);
    }

    /// Authenticate and store a new session token, replacing any prior one.
    pub fn create_session(&self, identity: &str, secret: &str) -> Result<SessionToken> {
        self.session.create_session(&self.backend, identity, secret)
    }

    /// Like [`Sdk::create_session`], but copies the token into `out` and
    /// returns its length.
    ///
    /// # Errors
    ///
    /// [`SdkError::BufferTooSmall`] if `out` cannot hold the token. The
    /// session is still established in that case and `out` is untouched.
    pub fn create_session_into(&self, identity: &str, secret: &str, out: &mut [u8]) -> Result<usize> {
        let token = self.create_session(identity, secret)?;
        let bytes = token.as_str().as_bytes();
        let dst = out
            .get_mut(..bytes.len())
            .ok_or(SdkError::BufferTooSmall {
                required: bytes.len(),
            })?;
        dst.copy_from_slice(bytes);
        Ok(bytes.len())
    }

    // ------------------------------------------------------------------
    // Key operations
    // ------------------------------------------------------------------

    /// Run a key operation against the backend.
    ///
    /// `READ` returns the material and caches it. `UPDATE` and `DELETE` drop
    /// any cached copy so the next crypto call refetches.
    ///
    /// # Errors
    ///
    /// [`SdkError::NotInitialized`], then [`SdkError::InvalidArgument`] for an
    /// empty name or `CREATE`/`UPDATE` without data, then
    /// [`SdkError::NoSession`], then the backend's failure.
    pub fn key_operation(
        &self,
        op: KeyOp,
        key_name: &str,
        key_data: Option<&[u8]>,
    ) -> Result<Option<KeyMaterial>> {
        self.session.require_initialized()?;
        if key_name.is_empty() {
            return Err(SdkError::invalid_argument("key name must not be empty"));
        }
        if op.requires_data() && key_data.map_or(true, <[u8]>::is_empty) {
            return Err(SdkError::InvalidArgument(format!("{op} requires key material")));
        }
        let token = self.session.require_session()?;

        let result = self.backend.key_op(&token, op, key_name, key_data)?;
        debug!(op = %op, key = %key_name, "key operation completed");

        match op {
            KeyOp::Read => {
                if let Some(material) = &result {
                    let cached = self
                        .session
                        .with_cache(|cache| cache.insert(key_name, material.as_bytes()));
                    if let Err(e) = cached {
                        warn!(key = %key_name, error = %e, "key read but not cached");
                    }
                }
            }
            KeyOp::Update | KeyOp::Delete => {
                if self.session.with_cache(|cache| cache.invalidate(key_name)) {
                    debug!(op = %op, key = %key_name, "cached key invalidated");
                }
            }
            KeyOp::Create => {}
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Crypto
    // ------------------------------------------------------------------

    /// Encrypt `plaintext` with the named key into `out`, returning the
    /// number of bytes written (`plaintext.len() + tag_len`).
    ///
    /// `iv` must be unique for every encryption under the same key.
    ///
    /// # Errors
    ///
    /// In order: [`SdkError::NotInitialized`] / [`SdkError::NoSession`],
    /// [`SdkError::UnsupportedOperation`] for an unknown algorithm,
    /// [`SdkError::KeyNotFound`] / [`SdkError::Crypto`] from key resolution,
    /// [`SdkError::Crypto`] from the cipher, and finally
    /// [`SdkError::BufferTooSmall`] with the exact required length. On any
    /// error `out` is left unmodified.
    pub fn do_crypto(
        &self,
        key_name: &str,
        algorithm: &str,
        iv: &[u8],
        plaintext: &[u8],
        out: &mut [u8],
    ) -> Result<usize> {
        let ciphertext = self.encrypt(key_name, algorithm, iv, plaintext)?;
        let dst = out
            .get_mut(..ciphertext.len())
            .ok_or(SdkError::BufferTooSmall {
                required: ciphertext.len(),
            })?;
        dst.copy_from_slice(&ciphertext);
        Ok(ciphertext.len())
    }

    /// Encrypt `plaintext` with the named key, returning `ciphertext || tag`.
    ///
    /// Same checks as [`Sdk::do_crypto`] without the output-buffer step.
    pub fn encrypt(&self, key_name: &str, algorithm: &str, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let (spec, key) = self.prepare(key_name, algorithm)?;
        Ok(crypto::encrypt(&spec, key.as_bytes(), iv, plaintext)?)
    }

    /// Decrypt `ciphertext || tag` produced by [`Sdk::encrypt`] under `iv`.
    ///
    /// # Errors
    ///
    /// [`SdkError::Crypto`] if the tag does not verify.
    pub fn decrypt(&self, key_name: &str, algorithm: &str, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let (spec, key) = self.prepare(key_name, algorithm)?;
        Ok(crypto::decrypt(&spec, key.as_bytes(), iv, ciphertext)?)
    }

    /// Encrypt under a freshly generated random IV.
    pub fn seal(&self, key_name: &str, algorithm: &str, plaintext: &[u8]) -> Result<SealedPayload> {
        let (spec, key) = self.prepare(key_name, algorithm)?;
        let iv = crypto::generate_iv(&spec);
        let ciphertext = crypto::encrypt(&spec, key.as_bytes(), &iv, plaintext)?;
        Ok(SealedPayload { iv, ciphertext })
    }

    /// Decrypt a payload produced by [`Sdk::seal`].
    pub fn open(&self, key_name: &str, algorithm: &str, sealed: &SealedPayload) -> Result<Vec<u8>> {
        self.decrypt(key_name, algorithm, &sealed.iv, &sealed.ciphertext)
    }

    /// Session check, algorithm lookup, then key resolution.
    fn prepare(&self, key_name: &str, algorithm: &str) -> Result<(CipherSpec, KeyMaterial)> {
        let token = self.session.require_session()?;
        let spec = crypto::lookup_spec(algorithm)
            .ok_or_else(|| SdkError::UnsupportedOperation(format!("algorithm {algorithm}")))?;
        if key_name.is_empty() {
            return Err(SdkError::invalid_argument("key name must not be empty"));
        }
        let key = KeyResolver::new(&self.session, &self.backend).resolve(
            &token,
            key_name,
            spec.required_key_len,
        )?;
        Ok((spec, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::cache::KeyCache;
    use std::collections::HashSet;
    use std::time::Duration;

    const IV: [u8; 12] = [0x24; 12];

    fn ready(backend: InMemoryBackend) -> Sdk<InMemoryBackend> {
        let sdk = Sdk::with_backend(backend);
        sdk.initialize("tok-1").unwrap();
        sdk.create_session("u", "p").unwrap();
        sdk
    }

    fn k1() -> InMemoryBackend {
        InMemoryBackend::new().with_key("K1", &[0x11; 32])
    }

    #[test]
    fn do_crypto_fetches_key_once_and_appends_tag() {
        let sdk = ready(k1());
        let mut buf = [0u8; 256];

        let n = sdk.do_crypto("K1", "AES-256-GCM", &IV, b"hello", &mut buf).unwrap();
        assert_eq!(n, 5 + 16);
        assert_eq!(sdk.backend().op_count(KeyOp::Read), 1);
        assert_eq!(sdk.cached_key_names(), vec!["K1".to_owned()]);

        sdk.do_crypto("K1", "AES-256-GCM", &IV, b"hello", &mut buf).unwrap();
        assert_eq!(sdk.backend().op_count(KeyOp::Read), 1);
    }

    #[test]
    fn do_crypto_before_session_is_no_session() {
        let sdk = Sdk::with_backend(k1());
        let mut buf = [0u8; 64];
        assert_eq!(
            sdk.do_crypto("K1", "AES-256-GCM", &IV, b"x", &mut buf).unwrap_err(),
            SdkError::NotInitialized
        );
        sdk.initialize("tok-1").unwrap();
        assert_eq!(
            sdk.do_crypto("K1", "AES-256-GCM", &IV, b"x", &mut buf).unwrap_err(),
            SdkError::NoSession
        );
        assert_eq!(sdk.backend().op_count(KeyOp::Read), 0);
    }

    #[test]
    fn small_buffer_reports_required_length_and_is_untouched() {
        let sdk = ready(k1());
        let mut buf = [0xAAu8; 10];
        assert_eq!(
            sdk.do_crypto("K1", "AES-256-GCM", &IV, b"hello", &mut buf).unwrap_err(),
            SdkError::BufferTooSmall { required: 21 }
        );
        assert_eq!(buf, [0xAAu8; 10]);

        let mut empty: [u8; 0] = [];
        assert_eq!(
            sdk.do_crypto("K1", "AES-256-GCM", &IV, b"hello", &mut empty).unwrap_err(),
            SdkError::BufferTooSmall { required: 21 }
        );
    }

    #[test]
    fn unknown_algorithm_is_checked_before_key_resolution() {
        let sdk = ready(k1());
        let mut buf = [0u8; 64];
        assert!(matches!(
            sdk.do_crypto("K1", "ROT13", &IV, b"x", &mut buf),
            Err(SdkError::UnsupportedOperation(_))
        ));
        assert_eq!(sdk.backend().op_count(KeyOp::Read), 0);
    }

    #[test]
    fn key_length_mismatch_is_crypto_error() {
        let sdk = ready(k1());
        let mut buf = [0u8; 64];
        assert!(matches!(
            sdk.do_crypto("K1", "AES-128-GCM", &IV, b"x", &mut buf),
            Err(SdkError::Crypto(_))
        ));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let sdk = ready(k1());
        let ct = sdk.encrypt("K1", "aes-256-gcm", &IV, b"attack at dawn").unwrap();
        assert_eq!(sdk.decrypt("K1", "AES-256-GCM", &IV, &ct).unwrap(), b"attack at dawn");

        let mut tampered = ct.clone();
        tampered[0] ^= 1;
        assert!(matches!(
            sdk.decrypt("K1", "AES-256-GCM", &IV, &tampered),
            Err(SdkError::Crypto(_))
        ));
    }

    #[test]
    fn seal_uses_fresh_iv() {
        let sdk = ready(k1());
        let a = sdk.seal("K1", "AES-256-GCM-SIV", b"same").unwrap();
        let b = sdk.seal("K1", "AES-256-GCM-SIV", b"same").unwrap();
        assert_ne!(a.iv, b.iv);

        let parsed: SealedPayload = a.to_string().parse().unwrap();
        assert_eq!(sdk.open("K1", "AES-256-GCM-SIV", &parsed).unwrap(), b"same");
    }

    #[test]
    fn create_session_into_small_buffer_still_stores_token() {
        let sdk = Sdk::with_backend(InMemoryBackend::new());
        sdk.initialize("tok-1").unwrap();

        let mut small = [0u8; 4];
        let err = sdk.create_session_into("u", "p", &mut small).unwrap_err();
        assert!(matches!(err, SdkError::BufferTooSmall { required } if required > 4));
        assert_eq!(small, [0u8; 4]);
        assert!(sdk.has_session());

        let mut buf = [0u8; 128];
        let n = sdk.create_session_into("u", "p", &mut buf).unwrap();
        let token = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(token.starts_with("mem-token-u-"));
    }

    #[test]
    fn key_operation_validation_order() {
        let sdk = Sdk::with_backend(InMemoryBackend::new());
        assert_eq!(
            sdk.key_operation(KeyOp::Read, "K1", None).unwrap_err(),
            SdkError::NotInitialized
        );
        sdk.initialize("tok-1").unwrap();
        assert!(matches!(
            sdk.key_operation(KeyOp::Create, "K1", None),
            Err(SdkError::InvalidArgument(_))
        ));
        assert!(matches!(
            sdk.key_operation(KeyOp::Read, "", None),
            Err(SdkError::InvalidArgument(_))
        ));
        assert_eq!(
            sdk.key_operation(KeyOp::Read, "K1", None).unwrap_err(),
            SdkError::NoSession
        );
    }

    #[test]
    fn key_operation_read_caches_and_delete_invalidates() {
        let sdk = ready(InMemoryBackend::new());
        sdk.key_operation(KeyOp::Create, "K2", Some(&[3u8; 32])).unwrap();
        assert!(sdk.cached_key_names().is_empty());

        let material = sdk.key_operation(KeyOp::Read, "K2", None).unwrap().unwrap();
        assert_eq!(material.as_bytes(), &[3u8; 32]);
        assert_eq!(sdk.cached_key_names(), vec!["K2".to_owned()]);

        sdk.encrypt("K2", "AES-256-GCM", &IV, b"x").unwrap();
        assert_eq!(sdk.backend().op_count(KeyOp::Read), 1);

        sdk.key_operation(KeyOp::Delete, "K2", None).unwrap();
        assert!(sdk.cached_key_names().is_empty());
        assert!(matches!(
            sdk.encrypt("K2", "AES-256-GCM", &IV, b"x"),
            Err(SdkError::KeyNotFound(_))
        ));
    }

    #[test]
    fn update_forces_refetch() {
        let sdk = ready(k1());
        let before = sdk.encrypt("K1", "AES-256-GCM", &IV, b"x").unwrap();
        sdk.key_operation(KeyOp::Update, "K1", Some(&[0x22; 32])).unwrap();
        let after = sdk.encrypt("K1", "AES-256-GCM", &IV, b"x").unwrap();
        assert_ne!(before, after);
        assert_eq!(sdk.backend().op_count(KeyOp::Read), 2);
    }

    #[test]
    fn key_operation_propagates_backend_errors() {
        let sdk = ready(k1());
        assert!(matches!(
            sdk.key_operation(KeyOp::Create, "K1", Some(&[0u8; 32])),
            Err(SdkError::BackendApi {
                status: Some(409),
                ..
            })
        ));
        sdk.backend().set_offline(true);
        assert!(matches!(
            sdk.key_operation(KeyOp::Read, "K1", None),
            Err(SdkError::Network(_))
        ));
    }

    #[test]
    fn cleanup_twice_matches_single_cleanup() {
        let sdk = ready(k1());
        sdk.encrypt("K1", "AES-256-GCM", &IV, b"x").unwrap();

        sdk.cleanup();
        let once = (sdk.is_initialized(), sdk.has_session(), sdk.cached_key_names());
        sdk.cleanup();
        let twice = (sdk.is_initialized(), sdk.has_session(), sdk.cached_key_names());
        assert_eq!(once, twice);
        assert_eq!(once, (false, false, Vec::new()));
        assert_eq!(sdk.backend().close_count(), 1);
    }

    #[test]
    fn concurrent_do_crypto_on_uncached_key() {
        let sdk = ready(k1().with_latency(Duration::from_millis(5)));

        let lengths: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..50)
                .map(|_| {
                    s.spawn(|| {
                        let mut buf = [0u8; 256];
                        sdk.do_crypto("K1", "AES-256-GCM", &IV, b"hello", &mut buf)
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(lengths.iter().all(|&n| n == 21));
        let reads = sdk.backend().op_count(KeyOp::Read);
        assert!((1..=50).contains(&reads));

        let names = sdk.cached_key_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names, vec!["K1".to_owned()]);
        assert_eq!(unique.len(), names.len());
        assert!(names.len() <= KeyCache::default().capacity());
    }

    #[test]
    fn from_config_rejects_invalid_endpoint() {
        let cfg = SdkConfig {
            api_endpoint: "not a url".into(),
            ..SdkConfig::default()
        };
        assert!(matches!(Sdk::from_config(cfg), Err(SdkError::InvalidArgument(_))));

        let cfg = SdkConfig {
            cache_capacity: 0,
            ..SdkConfig::default()
        };
        assert!(matches!(Sdk::from_config(cfg), Err(SdkError::InvalidArgument(_))));
    }
}
