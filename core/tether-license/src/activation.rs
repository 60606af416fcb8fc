//! Online activation against the issuing service.
//!
//! Connection-level failures and 500/502/503/504 responses are retried with
//! exponential backoff (100ms, 200ms, 400ms, ...). Anything else is
//! answered immediately. The local store is written only after the returned
//! license has been decoded, checked against the package table, and found
//! bound to the requesting machine.

use crate::codec::{self, EncodedLicense};
use crate::config::AgentConfig;
use crate::device::Fingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::license::{License, Package, PackageTable};
use crate::store::LicenseStore;
use crate::wire::{ACTIVATE_PATH, ActivationRequest, ActivationResponse, ErrorResponse};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tether_crypto::SharedKey;
use tracing::{info, warn};

/// Base delay between retries (doubles each attempt).
const BASE_DELAY_MS: u64 = 100;

/// Statuses treated as transient server failures.
const RETRYABLE_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Requests licenses from the activation service and installs them locally.
#[derive(Debug, Clone)]
pub struct ActivationClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    packages: PackageTable,
    key: Arc<SharedKey>,
    store: Arc<LicenseStore>,
}

impl ActivationClient {
    /// Builds a client from agent configuration.
    pub fn new(
        config: &AgentConfig,
        key: Arc<SharedKey>,
        store: Arc<LicenseStore>,
    ) -> LicenseResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LicenseError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}{ACTIVATE_PATH}", config.server_url.trim_end_matches('/')),
            max_retries: config.max_retries,
            packages: config.packages.clone(),
            key,
            store,
        })
    }

    /// Activates `package` for `fingerprint` and replaces the stored license.
    ///
    /// # Errors
    ///
    /// - `Network` once the retry budget is spent
    /// - `Rejected` for a non-retryable error status
    /// - `Protocol` for a malformed success body
    /// - `Decryption` / `Schema` from decoding, unchanged
    /// - `Binding` if the license is bound to another machine
    ///
    /// On error the stored license is left untouched.
    pub async fn activate(&self, fingerprint: &Fingerprint, package: Package) -> LicenseResult<License> {
        let request = ActivationRequest {
            machine_id: fingerprint.as_str().to_string(),
            package: package.code().to_string(),
        };

        info!(machine_id = %fingerprint, %package, "requesting activation");
        let response = self.send_with_retry(&request).await?;
        let blob = parse_success(response).await?;

        let license = codec::decode(&blob, &self.key)?;
        if &license.machine_fingerprint != fingerprint {
            warn!(
                expected = %fingerprint,
                found = %license.machine_fingerprint,
                "activation returned a license for another machine"
            );
            return Err(LicenseError::Binding {
                expected: fingerprint.to_string(),
                found: license.machine_fingerprint.to_string(),
            });
        }
        license.check_terms(&self.packages)?;

        self.store.save(&blob)?;
        info!(%package, expires_at = ?license.expires_at, "license activated");
        Ok(license)
    }

    /// Sends the request, retrying transient failures.
    ///
    /// Returns the first response that is not a retryable status.
    async fn send_with_retry(&self, request: &ActivationRequest) -> LicenseResult<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let last_error = match self.http.post(&self.endpoint).json(request).send().await {
                Ok(resp) if RETRYABLE_STATUSES.contains(&resp.status()) => {
                    format!("server returned {}", resp.status())
                }
                Ok(resp) => return Ok(resp),
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                return Err(LicenseError::Network(format!(
                    "gave up after {} attempts: {last_error}",
                    attempt + 1
                )));
            }

            let delay = Duration::from_millis(BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt)));
            warn!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                "activation request failed, retrying in {delay:?}: {last_error}"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Extracts the sealed license from a response, or turns an error status
/// into `Rejected`.
async fn parse_success(response: reqwest::Response) -> LicenseResult<EncodedLicense> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
        return Err(LicenseError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let body: ActivationResponse = response
        .json()
        .await
        .map_err(|e| LicenseError::Protocol(format!("malformed activation response: {e}")))?;
    EncodedLicense::from_base64(&body.license)
}
