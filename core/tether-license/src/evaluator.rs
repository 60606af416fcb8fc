//! Validity evaluation.
//!
//! Pure function of the decoded license, the local fingerprint and the
//! current time. The fingerprint is checked before expiry, and the instant
//! of expiry itself counts as expired.

use crate::device::Fingerprint;
use crate::license::{License, Package};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The validity state of the local license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LicenseState {
    /// No license decoded successfully.
    Absent,
    /// Decoded, but bound to another machine.
    FingerprintMismatch,
    /// Usable. `expires_at` is `None` for perpetual licenses.
    Active {
        package: Package,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Past its expiry.
    Expired {
        package: Package,
        expired_at: DateTime<Utc>,
    },
}

impl LicenseState {
    /// Returns true if gated functionality may run.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Time left before expiry. `None` unless active with a finite expiry.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        match self {
            Self::Active {
                expires_at: Some(exp),
                ..
            } => Some(*exp - now),
            _ => None,
        }
    }
}

impl fmt::Display for LicenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::FingerprintMismatch => f.write_str("bound to another machine"),
            Self::Active {
                package,
                expires_at: None,
            } => write!(f, "active ({package}, perpetual)"),
            Self::Active {
                package,
                expires_at: Some(exp),
            } => write!(f, "active ({package}, until {})", exp.to_rfc3339()),
            Self::Expired {
                package,
                expired_at,
            } => write!(f, "expired ({package}, on {})", expired_at.to_rfc3339()),
        }
    }
}

/// Evaluates a decoded license against the local fingerprint at `now`.
#[must_use]
pub fn evaluate(
    license: Option<&License>,
    fingerprint: &Fingerprint,
    now: DateTime<Utc>,
) -> LicenseState {
    let Some(license) = license else {
        return LicenseState::Absent;
    };

    if &license.machine_fingerprint != fingerprint {
        return LicenseState::FingerprintMismatch;
    }

    match license.expires_at {
        None => LicenseState::Active {
            package: license.package,
            expires_at: None,
        },
        Some(exp) if now < exp => LicenseState::Active {
            package: license.package,
            expires_at: Some(exp),
        },
        Some(exp) => LicenseState::Expired {
            package: license.package,
            expired_at: exp,
        },
    }
}
