//! [`SealedPayload`]: ciphertext bundled with the IV it was produced under.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use super::cipher::CipherError;

/// Prefix that appears at the start of every sealed payload string.
pub const VERSION_PREFIX: &str = "v1";

/// An IV plus the `ciphertext || tag` produced under it.
///
/// The string representation is `v1.<base64url(iv)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Raw IV bytes.
    pub iv: Vec<u8>,
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl SealedPayload {
    /// Encode this value to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        format!(
            "{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(&self.iv),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }
}

impl fmt::Display for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_repr())
    }
}

impl FromStr for SealedPayload {
    type Err = CipherError;

    /// Parse a `v1.<iv>.<ciphertext>` string.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] on a wrong prefix, a missing
    /// part, an empty IV, or invalid base64.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(3, '.').collect();
        if parts.len() != 3 || parts[0] != VERSION_PREFIX {
            return Err(CipherError::InvalidFormat);
        }
        let iv = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| CipherError::InvalidFormat)?;
        if iv.is_empty() {
            return Err(CipherError::InvalidFormat);
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| CipherError::InvalidFormat)?;

        Ok(Self { iv, ciphertext })
    }
}
