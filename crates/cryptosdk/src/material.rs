//! Owned secret buffers: key material and session tokens.
//!
//! Both types zero their memory on drop and never print their contents,
//! not even in debug builds.

use std::fmt;

use zeroize::Zeroizing;

/// Raw symmetric key bytes retrieved from (or sent to) the backend.
///
/// Clones are independent copies; each one is zeroed when dropped. Callers
/// should use and drop them promptly.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Zeroizing<Vec<u8>>);

impl KeyMaterial {
    /// Copy `bytes` into a new zeroizing buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }

    /// Borrow the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the material is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {} bytes])", self.len())
    }
}

/// Bearer credential proving a successful authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    /// Wrap a token string returned by the backend.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Borrow the token for use in an `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the token in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_material_redacted_in_debug() {
        let key = KeyMaterial::from_slice(&[0xAB; 32]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(dbg.contains("32 bytes"));
        assert!(!dbg.to_lowercase().contains("ab, ab"));
    }

    #[test]
    fn session_token_redacted_in_debug() {
        let token = SessionToken::new("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert_eq!(format!("{token:?}"), "SessionToken([REDACTED])");
        assert_eq!(token.as_str(), "eyJhbGciOiJIUzI1NiJ9.payload.sig");
    }

    #[test]
    fn clones_are_independent() {
        let key = KeyMaterial::from(vec![1, 2, 3]);
        let copy = key.clone();
        drop(key);
        assert_eq!(copy.as_bytes(), &[1, 2, 3]);
    }
}
