//! Error types for the licensing module.

use crate::evaluator::LicenseState;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Every variant is recoverable; callers degrade to "no usable license"
/// rather than aborting.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Fingerprint failed the length/format sanity check.
    #[error("invalid machine fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Package code is not in the package table in use.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// License could not be serialized or sealed.
    #[error("license encoding failed: {0}")]
    Encoding(String),

    /// Authentication failed (wrong key, corrupted or tampered bytes).
    #[error("license decryption failed: {0}")]
    Decryption(String),

    /// Decrypted bytes are not a complete, well-formed license.
    #[error("invalid license schema: {0}")]
    Schema(String),

    /// License is bound to a different machine.
    #[error("license is bound to another machine (expected {expected}, found {found})")]
    Binding { expected: String, found: String },

    /// Transport failure after the retry budget was spent.
    #[error("network error: {0}")]
    Network(String),

    /// Response body was malformed or missing an expected field.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server answered with a non-retryable error status.
    #[error("activation rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A gated operation was attempted without an active license.
    #[error("an active license is required (current state: {0})")]
    LicenseRequired(LicenseState),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LicenseError {
    /// Returns true for failures worth retrying later (network only).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true for rejections of caller-supplied input.
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::InvalidFingerprint(_) | Self::InvalidPackage(_))
    }
}

impl From<std::io::Error> for LicenseError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
