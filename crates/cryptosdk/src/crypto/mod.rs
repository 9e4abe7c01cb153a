//! Cipher gateway: algorithm registry and AEAD primitives.
//!
//! This module is free of backend and session dependencies. It maps an
//! algorithm identifier to a [`CipherSpec`] and performs encrypt / decrypt
//! with already-validated key and IV material.
//!
//! # Ciphertext layout
//!
//! ```text
//! ciphertext || tag (16 bytes)
//! ```
//!
//! [`SealedPayload`] adds the IV in a versioned text form:
//!
//! ```text
//! v1.<base64url-no-pad(iv)>.<base64url-no-pad(ciphertext+tag)>
//! ```

pub mod cipher;
pub mod sealed;

pub use cipher::{
    decrypt, encrypt, generate_iv, lookup_spec, registry, Algorithm, CipherError, CipherSpec,
    IV_LEN, TAG_LEN,
};
pub use sealed::SealedPayload;
