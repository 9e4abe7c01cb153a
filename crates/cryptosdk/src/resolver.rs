//! Key resolution: cache first, backend `READ` on a miss.

use common::{KeyOp, SdkError};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::material::{KeyMaterial, SessionToken};
use crate::session::SessionState;

/// Resolves key names to material of a required length.
///
/// Borrowed per call from an [`crate::Sdk`]; holds no state of its own.
pub struct KeyResolver<'a, B: ?Sized> {
    session: &'a SessionState,
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> KeyResolver<'a, B> {
    pub fn new(session: &'a SessionState, backend: &'a B) -> Self {
        Self { session, backend }
    }

    /// Return a copy of the material for `key_name`, fetching it with `token`
    /// if it is not cached.
    ///
    /// Concurrent misses for the same name may each fetch and insert; the
    /// last insert wins and the cache stays consistent.
    ///
    /// # Errors
    ///
    /// - [`SdkError::KeyNotFound`] if the backend read fails for any reason, or
    ///   the entry was evicted again before it could be read back.
    /// - [`SdkError::Crypto`] if the material length is not `required_len`, or
    ///   the backend returned material too large to cache.
    pub fn resolve(
        &self,
        token: &SessionToken,
        key_name: &str,
        required_len: usize,
    ) -> Result<KeyMaterial, SdkError> {
        let material = match self.cached(key_name) {
            Some(material) => {
                debug!(key = %key_name, "key cache hit");
                material
            }
            None => {
                debug!(key = %key_name, "key cache miss, fetching from backend");
                self.fetch_and_cache(token, key_name)?
            }
        };

        if material.len() != required_len {
            return Err(SdkError::Crypto(format!(
                "key {key_name} is {} bytes, algorithm requires {required_len}",
                material.len()
            )));
        }
        Ok(material)
    }

    fn cached(&self, key_name: &str) -> Option<KeyMaterial> {
        self.session.with_cache(|cache| {
            cache
                .lookup(key_name)
                .map(|entry| KeyMaterial::from_slice(entry.material()))
        })
    }

    fn fetch_and_cache(&self, token: &SessionToken, key_name: &str) -> Result<KeyMaterial, SdkError> {
        let fetched = match self.backend.key_op(token, KeyOp::Read, key_name, None) {
            Ok(Some(material)) => material,
            Ok(None) => {
                warn!(key = %key_name, "backend returned no material for key");
                return Err(SdkError::KeyNotFound(key_name.to_owned()));
            }
            Err(e) => {
                warn!(key = %key_name, error = %e, "backend key read failed");
                return Err(SdkError::KeyNotFound(key_name.to_owned()));
            }
        };

        self.session
            .with_cache(|cache| cache.insert(key_name, fetched.as_bytes()))
            .map_err(|e| SdkError::Crypto(format!("cannot cache key {key_name}: {e}")))?;

        // Another thread may have evicted it in between.
        self.cached(key_name)
            .ok_or_else(|| SdkError::KeyNotFound(key_name.to_owned()))
    }
}
