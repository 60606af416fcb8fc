//! JSON bodies of the `/activate` exchange.

use serde::{Deserialize, Serialize};

/// Path of the activation endpoint.
pub const ACTIVATE_PATH: &str = "/activate";

/// `POST /activate` request body.
///
/// Both fields are kept as raw strings, and default to empty when missing,
/// so that bad values reach validation and get a specific error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationRequest {
    pub machine_id: String,
    pub package: String,
}

/// Success body: the sealed license, base64-wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationResponse {
    pub license: String,
}

/// Failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
