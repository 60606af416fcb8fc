//! The license record and the package-duration table.
//!
//! A [`License`] is immutable once minted. Expiry is fixed at mint time from
//! the [`PackageTable`]; renewal produces a new record rather than editing
//! the old one.

use crate::device::Fingerprint;
use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const MINUTE: i64 = 60;
const DAY: i64 = 24 * 60 * MINUTE;

/// Default length of a locally minted trial, in seconds.
pub const DEFAULT_TRIAL_SECS: i64 = 3 * MINUTE;

/// A subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Package {
    /// One month (30 days).
    #[serde(rename = "1M")]
    OneMonth,
    /// Three months (90 days).
    #[serde(rename = "3M")]
    ThreeMonths,
    /// Six months (180 days).
    #[serde(rename = "6M")]
    SixMonths,
    /// Never expires.
    #[serde(rename = "PERM")]
    Perpetual,
    /// Short local trial.
    #[serde(rename = "TRIAL")]
    Trial,
}

impl Package {
    /// All packages, in display order.
    pub const ALL: [Package; 5] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::Perpetual,
        Self::Trial,
    ];

    /// Returns the wire code (`"1M"`, `"PERM"`, ...).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::Perpetual => "PERM",
            Self::Trial => "TRIAL",
        }
    }

    /// Returns true for the package exempt from expiry.
    #[must_use]
    pub fn is_perpetual(&self) -> bool {
        matches!(self, Self::Perpetual)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Package {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| LicenseError::InvalidPackage(s.to_string()))
    }
}

/// Maps each offered package to its duration in seconds (`None` = perpetual).
///
/// Built once at startup and passed to whatever mints or checks licenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageTable {
    terms: BTreeMap<Package, Option<i64>>,
}

impl PackageTable {
    /// An empty table. Every lookup fails until terms are added.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    /// The packages the issuing service sells: 1M, 3M, 6M and PERM.
    #[must_use]
    pub fn issuer_default() -> Self {
        Self::empty()
            .with_term(Package::OneMonth, Some(30 * DAY))
            .with_term(Package::ThreeMonths, Some(90 * DAY))
            .with_term(Package::SixMonths, Some(180 * DAY))
            .with_term(Package::Perpetual, None)
    }

    /// Adds or replaces a term. The perpetual package is always stored without
    /// a duration.
    #[must_use]
    pub fn with_term(mut self, package: Package, secs: Option<i64>) -> Self {
        let secs = if package.is_perpetual() { None } else { secs };
        self.terms.insert(package, secs);
        self
    }

    /// Returns true if the package is offered.
    #[must_use]
    pub fn contains(&self, package: Package) -> bool {
        self.terms.contains_key(&package)
    }

    /// Returns the configured duration of a package.
    ///
    /// `Ok(None)` means perpetual. A package missing from the table, or a
    /// non-perpetual package without a positive duration, is rejected.
    pub fn duration(&self, package: Package) -> LicenseResult<Option<TimeDelta>> {
        match self.terms.get(&package) {
            None => Err(LicenseError::InvalidPackage(package.code().to_string())),
            Some(_) if package.is_perpetual() => Ok(None),
            Some(Some(secs)) if *secs > 0 => TimeDelta::try_seconds(*secs)
                .map(Some)
                .ok_or_else(|| LicenseError::InvalidPackage(format!("{package}: duration out of range"))),
            Some(_) => Err(LicenseError::InvalidPackage(format!(
                "{package}: no duration configured"
            ))),
        }
    }

    /// Computes `expires_at` for a license of this package issued at `issued_at`.
    pub fn expiry_for(
        &self,
        package: Package,
        issued_at: DateTime<Utc>,
    ) -> LicenseResult<Option<DateTime<Utc>>> {
        match self.duration(package)? {
            None => Ok(None),
            Some(d) => issued_at
                .checked_add_signed(d)
                .map(Some)
                .ok_or_else(|| LicenseError::InvalidPackage(format!("{package}: expiry overflow"))),
        }
    }
}

impl Default for PackageTable {
    /// The agent-side table: everything the issuer sells plus the local trial.
    fn default() -> Self {
        Self::issuer_default().with_term(Package::Trial, Some(DEFAULT_TRIAL_SECS))
    }
}

/// Informational registration label. Never used for gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Issued by the activation service.
    Registered,
    /// Minted locally on first run.
    Trial,
}

/// A license record.
///
/// Every field is required on decode; `expires_at` must be present even when
/// it is `null` (perpetual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Display identity of the licensee.
    pub subject: String,
    /// Granted capability tier.
    pub entitlement: String,
    /// Creation time (whole seconds).
    pub issued_at: DateTime<Utc>,
    /// Registration label.
    pub status: RegistrationStatus,
    /// Expiry time, or `None` for perpetual.
    #[serde(deserialize_with = "Option::deserialize")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Subscription tier.
    pub package: Package,
    /// The machine this license is bound to.
    pub machine_fingerprint: Fingerprint,
}

/// Inputs for minting a license.
#[derive(Debug, Clone)]
pub struct MintParams<'a> {
    /// Licensee display name.
    pub subject: &'a str,
    /// Capability tier string.
    pub entitlement: &'a str,
    /// Registration label.
    pub status: RegistrationStatus,
    /// Requested package.
    pub package: Package,
    /// Machine to bind to.
    pub fingerprint: &'a Fingerprint,
}

impl License {
    /// Mints a new license at `now` (truncated to whole seconds).
    ///
    /// # Errors
    ///
    /// Returns `InvalidPackage` if the package is not in `table`.
    pub fn mint(
        table: &PackageTable,
        params: MintParams<'_>,
        now: DateTime<Utc>,
    ) -> LicenseResult<Self> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = table.expiry_for(params.package, issued_at)?;

        Ok(Self {
            subject: params.subject.to_string(),
            entitlement: params.entitlement.to_string(),
            issued_at,
            status: params.status,
            expires_at,
            package: params.package,
            machine_fingerprint: params.fingerprint.clone(),
        })
    }

    /// Returns true if this license never expires.
    #[must_use]
    pub fn is_perpetual(&self) -> bool {
        self.expires_at.is_none()
    }

    /// Checks the table-independent shape: PERM carries no expiry, every other
    /// package carries one strictly after `issued_at`.
    pub fn check_shape(&self) -> LicenseResult<()> {
        match (self.package.is_perpetual(), self.expires_at) {
            (true, None) => Ok(()),
            (true, Some(_)) => Err(LicenseError::Schema(
                "perpetual license must not carry an expiry".to_string(),
            )),
            (false, None) => Err(LicenseError::Schema(format!(
                "{} license is missing its expiry",
                self.package
            ))),
            (false, Some(exp)) if exp <= self.issued_at => Err(LicenseError::Schema(
                "expiry is not after issue time".to_string(),
            )),
            (false, Some(_)) => Ok(()),
        }
    }

    /// Checks that the package is offered by `table` and that `expires_at`
    /// equals `issued_at + duration(package)`.
    pub fn check_terms(&self, table: &PackageTable) -> LicenseResult<()> {
        self.check_shape()?;
        let expected = table
            .expiry_for(self.package, self.issued_at)
            .map_err(|e| LicenseError::Schema(e.to_string()))?;
        if expected != self.expires_at {
            return Err(LicenseError::Schema(format!(
                "expiry does not match the {} term",
                self.package
            )));
        }
        Ok(())
    }
}
