//! `mock-backend`: an in-memory key-management service speaking the REST API
//! that `cryptosdk::HttpBackend` consumes.
//!
//! Intended for local development and end-to-end tests. Keys live only in
//! process memory and are scoped to the identity that created them.

pub mod auth;
pub mod config;
pub mod server;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use server::state::AppState;
