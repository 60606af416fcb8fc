//! The shared symmetric secret.
//!
//! One key is generated by the admin tool and distributed to the issuing
//! service and every consuming agent. Its text form is standard base64.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the shared key in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// The shared license key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey {
    bytes: [u8; KEY_SIZE],
}

impl SharedKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parses the base64 text form. Surrounding whitespace is ignored.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;

        let bytes: [u8; KEY_SIZE] =
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: decoded.len(),
                })?;

        Ok(Self { bytes })
    }

    /// Returns the base64 text form, suitable for key files and env vars.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl PartialEq for SharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SharedKey {}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
