//! Algorithm registry and AEAD encryption / decryption.
//!
//! **Never reuse an IV with the same key.** For AES-GCM, a repeated
//! (key, IV) pair breaks confidentiality and lets an attacker forge tags.
//! AES-GCM-SIV degrades more gracefully but still leaks plaintext equality.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, Nonce, OsRng},
    Aes128Gcm, Aes256Gcm,
};
use aes_gcm_siv::Aes256GcmSiv;
use common::SdkError;
use thiserror::Error;

/// Byte length of every registered cipher's IV (96 bits).
pub const IV_LEN: usize = 12;

/// Byte length of every registered cipher's authentication tag (128 bits).
pub const TAG_LEN: usize = 16;

/// Cipher implementations known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// AES-128 in Galois/Counter Mode.
    Aes128Gcm,
    /// AES-256 in Galois/Counter Mode.
    Aes256Gcm,
    /// AES-256-GCM-SIV (RFC 8452), nonce-misuse resistant.
    Aes256GcmSiv,
}

/// Parameters needed to invoke a cipher correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSpec {
    /// Implementation to dispatch to.
    pub algorithm: Algorithm,
    /// Canonical identifier, e.g. `"AES-256-GCM"`.
    pub algorithm_id: &'static str,
    /// Exact key length in bytes.
    pub required_key_len: usize,
    /// IV length in bytes.
    pub iv_len: usize,
    /// Length of the tag appended to the ciphertext.
    pub tag_len: usize,
}

impl CipherSpec {
    /// Ciphertext length (including tag) for a plaintext of `plaintext_len` bytes.
    pub fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        plaintext_len + self.tag_len
    }
}

const REGISTRY: [CipherSpec; 3] = [
    CipherSpec {
        algorithm: Algorithm::Aes128Gcm,
        algorithm_id: "AES-128-GCM",
        required_key_len: 16,
        iv_len: IV_LEN,
        tag_len: TAG_LEN,
    },
    CipherSpec {
        algorithm: Algorithm::Aes256Gcm,
        algorithm_id: "AES-256-GCM",
        required_key_len: 32,
        iv_len: IV_LEN,
        tag_len: TAG_LEN,
    },
    CipherSpec {
        algorithm: Algorithm::Aes256GcmSiv,
        algorithm_id: "AES-256-GCM-SIV",
        required_key_len: 32,
        iv_len: IV_LEN,
        tag_len: TAG_LEN,
    },
];

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key does not match the cipher's required length.
    #[error("invalid key length for {algorithm_id}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        algorithm_id: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The IV does not match the cipher's IV length.
    #[error("invalid IV length for {algorithm_id}: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        algorithm_id: &'static str,
        expected: usize,
        actual: usize,
    },

    /// AEAD encryption or decryption failed (for decryption: wrong key or tampered data).
    #[error("aead operation failed")]
    AeadFailure,

    /// A sealed payload string does not match the expected format.
    #[error("invalid sealed payload format")]
    InvalidFormat,
}

impl From<CipherError> for SdkError {
    fn from(e: CipherError) -> Self {
        SdkError::Crypto(e.to_string())
    }
}

/// Every registered cipher spec.
pub fn registry() -> &'static [CipherSpec] {
    &REGISTRY
}

/// Look up the spec for `algorithm_id`, ignoring ASCII case.
///
/// Returns `None` for unknown identifiers; callers map that to
/// [`SdkError::UnsupportedOperation`].
pub fn lookup_spec(algorithm_id: &str) -> Option<CipherSpec> {
    REGISTRY
        .iter()
        .find(|spec| spec.algorithm_id.eq_ignore_ascii_case(algorithm_id))
        .copied()
}

/// Draw a fresh random IV of `spec.iv_len` bytes from the OS CSPRNG.
pub fn generate_iv(spec: &CipherSpec) -> Vec<u8> {
    let mut iv = vec![0u8; spec.iv_len];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext`, returning `ciphertext || tag`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] or [`CipherError::InvalidIvLength`]
/// if the material does not fit `spec`, and [`CipherError::AeadFailure`] if
/// the underlying cipher rejects the operation.
pub fn encrypt(
    spec: &CipherSpec,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    check_lengths(spec, key, iv)?;
    match spec.algorithm {
        Algorithm::Aes128Gcm => seal_with::<Aes128Gcm>(spec, key, iv, plaintext),
        Algorithm::Aes256Gcm => seal_with::<Aes256Gcm>(spec, key, iv, plaintext),
        Algorithm::Aes256GcmSiv => seal_with::<Aes256GcmSiv>(spec, key, iv, plaintext),
    }
}

/// Decrypt `ciphertext || tag`, verifying the tag.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key,
/// wrong IV, or tampered data); never returns unauthenticated plaintext.
pub fn decrypt(
    spec: &CipherSpec,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    check_lengths(spec, key, iv)?;
    if ciphertext.len() < spec.tag_len {
        return Err(CipherError::AeadFailure);
    }
    match spec.algorithm {
        Algorithm::Aes128Gcm => open_with::<Aes128Gcm>(spec, key, iv, ciphertext),
        Algorithm::Aes256Gcm => open_with::<Aes256Gcm>(spec, key, iv, ciphertext),
        Algorithm::Aes256GcmSiv => open_with::<Aes256GcmSiv>(spec, key, iv, ciphertext),
    }
}

fn check_lengths(spec: &CipherSpec, key: &[u8], iv: &[u8]) -> Result<(), CipherError> {
    if key.len() != spec.required_key_len {
        return Err(CipherError::InvalidKeyLength {
            algorithm_id: spec.algorithm_id,
            expected: spec.required_key_len,
            actual: key.len(),
        });
    }
    if iv.len() != spec.iv_len {
        return Err(CipherError::InvalidIvLength {
            algorithm_id: spec.algorithm_id,
            expected: spec.iv_len,
            actual: iv.len(),
        });
    }
    Ok(())
}

fn build_cipher<C: KeyInit>(spec: &CipherSpec, key: &[u8]) -> Result<C, CipherError> {
    C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
        algorithm_id: spec.algorithm_id,
        expected: spec.required_key_len,
        actual: key.len(),
    })
}

fn seal_with<C: Aead + KeyInit>(
    spec: &CipherSpec,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher::<C>(spec, key)?;
    cipher
        .encrypt(Nonce::<C>::from_slice(iv), plaintext)
        .map_err(|_| CipherError::AeadFailure)
}

fn open_with<C: Aead + KeyInit>(
    spec: &CipherSpec,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher::<C>(spec, key)?;
    cipher
        .decrypt(Nonce::<C>::from_slice(iv), ciphertext)
        .map_err(|_| CipherError::AeadFailure)
}
