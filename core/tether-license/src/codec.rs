//! License encoding: canonical JSON sealed with the shared key.
//!
//! `decode` distinguishes an authentication failure (`Decryption`) from a
//! plaintext that is not a complete license (`Schema`) so callers can tell
//! a corrupt or foreign file apart from a version mismatch.

use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use base64::{Engine, engine::general_purpose::STANDARD};
use tether_crypto::{CryptoError, Sealed, SharedKey};

/// The opaque sealed form of a license: `nonce || ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLicense(Vec<u8>);

impl EncodedLicense {
    /// Wraps raw cipher output (e.g. read back from the store).
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base64 wrapper used on text channels.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Unwraps the base64 text form.
    pub fn from_base64(encoded: &str) -> LicenseResult<Self> {
        STANDARD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| LicenseError::Protocol(format!("license is not valid base64: {e}")))
    }
}

/// Serializes and seals a license.
pub fn encode(license: &License, key: &SharedKey) -> LicenseResult<EncodedLicense> {
    let json = serde_json::to_vec(license).map_err(|e| LicenseError::Encoding(e.to_string()))?;
    let sealed =
        tether_crypto::seal(key, &json).map_err(|e| LicenseError::Encoding(e.to_string()))?;
    Ok(EncodedLicense(sealed.to_bytes()))
}

/// Opens and parses a license. Pure; never retried.
pub fn decode(blob: &EncodedLicense, key: &SharedKey) -> LicenseResult<License> {
    let sealed = Sealed::from_bytes(&blob.0).map_err(crypto_to_decryption)?;
    let plaintext = tether_crypto::open(key, &sealed).map_err(crypto_to_decryption)?;

    let license: License = serde_json::from_slice(&plaintext)
        .map_err(|e| LicenseError::Schema(e.to_string()))?;
    license.check_shape()?;
    Ok(license)
}

fn crypto_to_decryption(err: CryptoError) -> LicenseError {
    LicenseError::Decryption(err.to_string())
}
