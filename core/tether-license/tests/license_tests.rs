mod common;

use chrono::TimeDelta;
use common::{fingerprint, mint, new_year_2024};
use pretty_assertions::assert_eq;
use tether_license::{
    DEFAULT_TRIAL_SECS, License, LicenseError, MintParams, Package, PackageTable,
    RegistrationStatus,
};

// ── Package ──────────────────────────────────────────────────────

#[test]
fn package_codes_roundtrip() {
    for p in Package::ALL {
        assert_eq!(p.code().parse::<Package>().unwrap(), p);
        assert_eq!(serde_json::to_string(&p).unwrap(), format!("\"{}\"", p.code()));
    }
}

#[test]
fn unknown_package_rejected() {
    assert!(matches!(
        "XYZ".parse::<Package>(),
        Err(LicenseError::InvalidPackage(code)) if code == "XYZ"
    ));
    assert!("1m".parse::<Package>().is_err());
    assert!(serde_json::from_str::<Package>("\"12M\"").is_err());
}

// ── PackageTable ─────────────────────────────────────────────────

#[test]
fn default_durations() {
    let table = PackageTable::default();
    assert_eq!(table.duration(Package::OneMonth).unwrap(), Some(TimeDelta::days(30)));
    assert_eq!(table.duration(Package::ThreeMonths).unwrap(), Some(TimeDelta::days(90)));
    assert_eq!(table.duration(Package::SixMonths).unwrap(), Some(TimeDelta::days(180)));
    assert_eq!(table.duration(Package::Perpetual).unwrap(), None);
    assert_eq!(
        table.duration(Package::Trial).unwrap(),
        Some(TimeDelta::seconds(DEFAULT_TRIAL_SECS))
    );
}

#[test]
fn issuer_table_excludes_trial() {
    let table = PackageTable::issuer_default();
    assert!(!table.contains(Package::Trial));
    assert!(matches!(
        table.duration(Package::Trial),
        Err(LicenseError::InvalidPackage(_))
    ));
}

#[test]
fn perpetual_term_ignores_duration() {
    let table = PackageTable::empty().with_term(Package::Perpetual, Some(10));
    assert_eq!(table.duration(Package::Perpetual).unwrap(), None);
}

#[test]
fn non_positive_duration_rejected() {
    let table = PackageTable::empty()
        .with_term(Package::OneMonth, Some(0))
        .with_term(Package::SixMonths, None);
    assert!(table.duration(Package::OneMonth).is_err());
    assert!(table.duration(Package::SixMonths).is_err());
}

#[test]
fn table_serde() {
    let table = PackageTable::default();
    let json = serde_json::to_string(&table).unwrap();
    assert!(json.contains("\"1M\":2592000"));
    assert!(json.contains("\"PERM\":null"));
    let parsed: PackageTable = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, table);
}

// ── Minting ──────────────────────────────────────────────────────

#[test]
fn one_month_scenario_expiry() {
    let fp = fingerprint('a');
    let license = mint(Package::OneMonth, &fp, new_year_2024());
    assert_eq!(license.issued_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    assert_eq!(
        license.expires_at.unwrap().to_rfc3339(),
        "2024-01-31T00:00:00+00:00"
    );
    assert_eq!(license.machine_fingerprint, fp);
}

#[test]
fn perpetual_has_no_expiry() {
    let license = mint(Package::Perpetual, &fingerprint('a'), new_year_2024());
    assert!(license.is_perpetual());
    assert!(license.expires_at.is_none());
}

#[test]
fn mint_truncates_subseconds() {
    let now = new_year_2024() + TimeDelta::milliseconds(750);
    let license = mint(Package::ThreeMonths, &fingerprint('a'), now);
    assert_eq!(license.issued_at, new_year_2024());
}

#[test]
fn mint_rejects_package_missing_from_table() {
    let fp = fingerprint('a');
    let result = License::mint(
        &PackageTable::issuer_default(),
        MintParams {
            subject: "x",
            entitlement: "y",
            status: RegistrationStatus::Trial,
            package: Package::Trial,
            fingerprint: &fp,
        },
        new_year_2024(),
    );
    assert!(matches!(result, Err(LicenseError::InvalidPackage(_))));
}

// ── Shape and term checks ────────────────────────────────────────

#[test]
fn minted_licenses_pass_checks() {
    for p in Package::ALL {
        let license = mint(p, &fingerprint('b'), new_year_2024());
        license.check_shape().unwrap();
        license.check_terms(&PackageTable::default()).unwrap();
    }
}

#[test]
fn perpetual_with_expiry_is_malformed() {
    let mut license = mint(Package::Perpetual, &fingerprint('a'), new_year_2024());
    license.expires_at = Some(new_year_2024());
    assert!(matches!(license.check_shape(), Err(LicenseError::Schema(_))));
}

#[test]
fn dated_package_without_expiry_is_malformed() {
    let mut license = mint(Package::SixMonths, &fingerprint('a'), new_year_2024());
    license.expires_at = None;
    assert!(matches!(license.check_shape(), Err(LicenseError::Schema(_))));
}

#[test]
fn stretched_expiry_fails_term_check() {
    let mut license = mint(Package::OneMonth, &fingerprint('a'), new_year_2024());
    license.expires_at = license.expires_at.map(|e| e + TimeDelta::days(365));
    license.check_shape().unwrap();
    assert!(matches!(
        license.check_terms(&PackageTable::default()),
        Err(LicenseError::Schema(_))
    ));
}

#[test]
fn license_serde_field_names() {
    let license = mint(Package::Perpetual, &fingerprint('c'), new_year_2024());
    let value = serde_json::to_value(&license).unwrap();
    for field in [
        "subject",
        "entitlement",
        "issued_at",
        "status",
        "expires_at",
        "package",
        "machine_fingerprint",
    ] {
        assert!(value.get(field).is_some(), "missing {field}");
    }
    assert_eq!(value["status"], "registered");
    assert_eq!(value["package"], "PERM");
    assert!(value["expires_at"].is_null());
}

#[test]
fn missing_expires_at_field_rejected() {
    let license = mint(Package::Perpetual, &fingerprint('c'), new_year_2024());
    let mut value = serde_json::to_value(&license).unwrap();
    value.as_object_mut().unwrap().remove("expires_at");
    assert!(serde_json::from_value::<License>(value).is_err());
}
