//! [`KeyStore`]: in-memory key material, partitioned by owning identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// Errors produced by the key store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("key already exists: {0}")]
    AlreadyExists(String),

    #[error("key not found: {0}")]
    NotFound(String),
}

type Material = Zeroizing<Vec<u8>>;

/// Thread-safe key store.
///
/// Each identity sees only the keys it created. Material is zeroed when a
/// key is replaced, deleted, or the store is dropped.
#[derive(Clone, Default)]
pub struct KeyStore {
    inner: Arc<RwLock<HashMap<String, HashMap<String, Material>>>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new key for `owner`.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if `owner` already has a key named `name`.
    pub async fn create(&self, owner: &str, name: &str, material: Vec<u8>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let keys = guard.entry(owner.to_owned()).or_default();
        if keys.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_owned()));
        }
        keys.insert(name.to_owned(), Zeroizing::new(material));
        Ok(())
    }

    /// Return a copy of `owner`'s key `name`.
    pub async fn read(&self, owner: &str, name: &str) -> Result<Material, StoreError> {
        let guard = self.inner.read().await;
        guard
            .get(owner)
            .and_then(|keys| keys.get(name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))
    }

    /// Replace the material of an existing key.
    pub async fn update(&self, owner: &str, name: &str, material: Vec<u8>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let slot = guard
            .get_mut(owner)
            .and_then(|keys| keys.get_mut(name))
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))?;
        *slot = Zeroizing::new(material);
        Ok(())
    }

    /// Remove an existing key.
    pub async fn delete(&self, owner: &str, name: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard
            .get_mut(owner)
            .and_then(|keys| keys.remove(name))
            .map(drop)
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))
    }

    /// Total number of keys across all owners.
    pub async fn len(&self) -> usize {
        self.inner.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyStore([REDACTED])")
    }
}
