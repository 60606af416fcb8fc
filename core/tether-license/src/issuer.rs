//! The issuing authority.
//!
//! Each request moves through `Received -> Validated -> Minted -> Responded`,
//! or stops at `Rejected`. The service keeps no state between requests:
//! two activations for the same machine and package just yield two licenses
//! with different `issued_at`.

use crate::codec::{self, EncodedLicense};
use crate::config::ServiceConfig;
use crate::device::Fingerprint;
use crate::error::LicenseResult;
use crate::license::{License, MintParams, Package, RegistrationStatus};
use crate::wire::ActivationRequest;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tether_crypto::SharedKey;
use tracing::{info, warn};

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub fingerprint: Fingerprint,
    pub package: Package,
}

/// Mints and seals licenses with the shared key.
#[derive(Debug, Clone)]
pub struct ActivationService {
    config: Arc<ServiceConfig>,
    key: Arc<SharedKey>,
}

impl ActivationService {
    pub fn new(config: ServiceConfig, key: SharedKey) -> Self {
        Self {
            config: Arc::new(config),
            key: Arc::new(key),
        }
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Validates the raw request fields.
    ///
    /// # Errors
    ///
    /// `InvalidFingerprint` if the machine id fails the sanity check,
    /// `InvalidPackage` if the package is unknown or not offered.
    pub fn validate(&self, request: &ActivationRequest) -> LicenseResult<ValidatedRequest> {
        let fingerprint = Fingerprint::parse(&request.machine_id)?;
        let package: Package = request.package.parse()?;
        // Known package but not sold here (e.g. TRIAL)
        self.config.packages.duration(package)?;
        Ok(ValidatedRequest {
            fingerprint,
            package,
        })
    }

    /// Mints a registered license for a validated request.
    pub fn mint(&self, request: &ValidatedRequest, now: DateTime<Utc>) -> LicenseResult<License> {
        License::mint(
            &self.config.packages,
            MintParams {
                subject: &self.config.subject,
                entitlement: &self.config.entitlement,
                status: RegistrationStatus::Registered,
                package: request.package,
                fingerprint: &request.fingerprint,
            },
            now,
        )
    }

    /// Runs the whole exchange at the current time.
    pub fn activate(&self, request: &ActivationRequest) -> LicenseResult<EncodedLicense> {
        self.activate_at(request, Utc::now())
    }

    /// Runs the whole exchange at `now`.
    pub fn activate_at(
        &self,
        request: &ActivationRequest,
        now: DateTime<Utc>,
    ) -> LicenseResult<EncodedLicense> {
        let validated = self.validate(request).inspect_err(|e| {
            warn!(machine_id = %request.machine_id, package = %request.package, "activation rejected: {e}");
        })?;

        let license = self.mint(&validated, now)?;
        let encoded = codec::encode(&license, &self.key)?;

        info!(
            machine_id = %validated.fingerprint,
            package = %validated.package,
            "activated license"
        );
        Ok(encoded)
    }
}
