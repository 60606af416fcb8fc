//! Machine-bound licensing for Tether.
//!
//! This crate handles:
//! - Machine fingerprinting for license binding
//! - Minting licenses for a package tier
//! - Sealing and opening licenses with the shared key
//! - Single-slot license storage
//! - Validity evaluation and gating
//! - Online activation against the issuing service (feature `online`)
//!
//! # License Format
//!
//! A license is canonical JSON sealed with ChaCha20-Poly1305 under the shared
//! key: `nonce || ciphertext`. The same bytes are stored on disk as-is and
//! sent over HTTP wrapped in base64.
//!
//! # Trust Model
//!
//! Issuer and agents hold the same symmetric key. Anyone who extracts it from
//! an agent can mint licenses; this resists casual copying, not reverse
//! engineering.

mod agent;
mod codec;
mod config;
mod device;
mod error;
mod evaluator;
mod issuer;
mod license;
mod store;
mod wire;

#[cfg(feature = "online")]
mod activation;

pub use agent::LicenseAgent;
pub use codec::{EncodedLicense, decode, encode};
pub use config::{
    AgentConfig, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL, ServiceConfig,
};
pub use device::{DeviceInfo, Fingerprint, MIN_FINGERPRINT_LEN};
pub use error::{LicenseError, LicenseResult};
pub use evaluator::{LicenseState, evaluate};
pub use issuer::{ActivationService, ValidatedRequest};
pub use license::{
    DEFAULT_TRIAL_SECS, License, MintParams, Package, PackageTable, RegistrationStatus,
};
pub use store::{LICENSE_FILE_NAME, LicenseStore, SlotEntry};
pub use wire::{ACTIVATE_PATH, ActivationRequest, ActivationResponse, ErrorResponse};

#[cfg(feature = "online")]
pub use activation::ActivationClient;

pub use tether_crypto::SharedKey;
