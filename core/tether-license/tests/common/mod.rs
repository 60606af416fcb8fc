//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tether_license::{
    AgentConfig, Fingerprint, License, MintParams, Package, PackageTable, RegistrationStatus,
    SharedKey,
};

/// Returns a deterministic shared key.
pub fn test_key() -> SharedKey {
    let bytes: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    SharedKey::from_bytes(bytes)
}

/// A fingerprint made of one repeated hex digit.
pub fn fingerprint(c: char) -> Fingerprint {
    Fingerprint::parse(&c.to_string().repeat(64)).unwrap()
}

/// 2024-01-01T00:00:00Z
pub fn new_year_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Mints a registered license with the default agent table.
pub fn mint(package: Package, fp: &Fingerprint, now: DateTime<Utc>) -> License {
    License::mint(
        &PackageTable::default(),
        MintParams {
            subject: "tester",
            entitlement: "Pro",
            status: RegistrationStatus::Registered,
            package,
            fingerprint: fp,
        },
        now,
    )
    .unwrap()
}

/// Agent config pointing at a license file inside `dir`.
pub fn agent_config(dir: &std::path::Path) -> AgentConfig {
    AgentConfig {
        license_path: Some(dir.join("license.bin")),
        ..AgentConfig::default()
    }
}
