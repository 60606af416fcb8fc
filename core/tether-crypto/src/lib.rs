//! Shared-key authenticated encryption for Tether.
//!
//! Licenses are sealed with ChaCha20-Poly1305 under a single 32-byte key that
//! the issuer and all agents hold. Confidentiality and integrity both come from
//! the AEAD; there is no separate MAC or signature.

mod cipher;
mod error;
mod key;

pub use cipher::{NONCE_SIZE, Sealed, TAG_SIZE, open, seal};
pub use error::{CryptoError, CryptoResult};
pub use key::{KEY_SIZE, SharedKey};
