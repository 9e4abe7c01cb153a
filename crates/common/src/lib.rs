//! Common types, wire protocol definitions, and errors shared by `cryptosdk`
//! and the mock backend.

pub mod error;
pub mod protocol;

pub use error::{Result, SdkError};
pub use protocol::KeyOp;
