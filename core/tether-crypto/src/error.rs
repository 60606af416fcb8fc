//! Error types for the shared-key cipher.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while sealing or opening data.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Sealed blob is shorter than nonce plus tag.
    #[error("sealed data too short: {len} bytes")]
    Truncated { len: usize },

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Key text is not valid base64.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),
}
