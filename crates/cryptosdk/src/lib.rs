//! `cryptosdk`: client SDK for a remote key-management backend.
//!
//! An [`Sdk`] instance owns one authenticated session and an in-memory cache
//! of key material fetched from the backend. A call such as
//! "encrypt with key `K` using `AES-256-GCM`" flows through:
//!
//! 1. [`session::SessionState`]: lifecycle (`uninitialised → initialised →
//!    session established`) and the single lock over token + cache.
//! 2. [`crypto::lookup_spec`]: algorithm id to key / IV / tag lengths.
//! 3. [`resolver::KeyResolver`]: cache hit, or a backend `READ` that
//!    populates the cache; validates the key length for the chosen cipher.
//! 4. [`crypto::encrypt`]: AEAD with the tag appended to the ciphertext.
//!
//! # Invariants
//!
//! - The lock is never held across a backend call or a cipher call.
//! - Key material and session tokens are zeroed when evicted, invalidated,
//!   dropped, or cleared by [`Sdk::cleanup`], and are never logged.
//! - IVs are the caller's responsibility for [`Sdk::do_crypto`] and
//!   [`Sdk::encrypt`]; reusing an IV with the same key under GCM breaks both
//!   confidentiality and authentication. [`Sdk::seal`] draws a fresh random IV.

pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod crypto;
pub mod material;
pub mod resolver;
pub mod session;

pub use backend::{Backend, BackendError, HttpBackend, InMemoryBackend};
pub use cache::KeyCache;
pub use client::Sdk;
pub use common::{protocol::ConfigResponse, KeyOp, Result, SdkError};
pub use config::SdkConfig;
pub use crypto::{CipherSpec, SealedPayload};
pub use material::{KeyMaterial, SessionToken};
