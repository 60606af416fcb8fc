//! Agent and issuer configuration.
//!
//! Both are plain values built once at startup and passed to the components
//! that need them. Neither holds the shared key; that is provisioned separately.

use crate::license::PackageTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default activation server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default retry budget after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration of a consuming agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the activation service.
    pub server_url: String,
    /// Timeout for each activation attempt.
    pub request_timeout: Duration,
    /// Retries after the first attempt on transient failures.
    pub max_retries: u32,
    /// License slot; `None` uses the platform data directory.
    pub license_path: Option<PathBuf>,
    /// Packages this agent accepts, including the local trial term.
    pub packages: PackageTable,
    /// Subject recorded on locally minted trials.
    pub trial_subject: String,
    /// Entitlement recorded on locally minted trials.
    pub trial_entitlement: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            license_path: None,
            packages: PackageTable::default(),
            trial_subject: "trial_user".to_string(),
            trial_entitlement: "Trial".to_string(),
        }
    }
}

/// Configuration of the issuing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Packages offered for activation.
    pub packages: PackageTable,
    /// Subject recorded on issued licenses.
    pub subject: String,
    /// Entitlement recorded on issued licenses.
    pub entitlement: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            packages: PackageTable::issuer_default(),
            subject: "licensee".to_string(),
            entitlement: "Standard".to_string(),
        }
    }
}
