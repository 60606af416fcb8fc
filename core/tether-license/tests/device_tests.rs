use tether_license::{DeviceInfo, Fingerprint, LicenseError, MIN_FINGERPRINT_LEN};

#[test]
fn device_info_collection() {
    let info = DeviceInfo::collect();
    assert!(!info.os_name.is_empty());
    assert!(!info.hostname.is_empty());
}

#[test]
fn device_info_serde() {
    let info = DeviceInfo::collect();
    let json = serde_json::to_string(&info).unwrap();
    let parsed: DeviceInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, info);
}

#[test]
fn fingerprint_is_sha256_hex() {
    let fp = Fingerprint::derive();
    assert_eq!(fp.as_str().len(), 64);
    assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn fingerprint_matches_known_digests() {
    let full = DeviceInfo {
        hostname: "build-01".into(),
        os_name: "linux".into(),
        cpu: Some("Intel(R) Xeon(R) CPU".into()),
        mac_address: Some("3C:7C:3F:1E:22:9A".into()),
    };
    assert_eq!(
        full.fingerprint().as_str(),
        "03d2aa5d090b92e24fb7caa7951c8f479dac1a91a39dc8151ce171d563eed1df"
    );

    let degraded = DeviceInfo {
        mac_address: None,
        ..full
    };
    assert_eq!(
        degraded.fingerprint().as_str(),
        "843e1bef0379916c72570262ace973cec491598c2038356529fd51ae6b5bd897"
    );
}

#[test]
fn fingerprint_stability() {
    assert_eq!(Fingerprint::derive(), Fingerprint::derive());
}

#[test]
fn fingerprint_passes_service_sanity_check() {
    let fp = Fingerprint::derive();
    assert_eq!(Fingerprint::parse(fp.as_str()).unwrap(), fp);
}

#[test]
fn fingerprint_depends_on_every_attribute() {
    let base = DeviceInfo {
        hostname: "host-a".into(),
        os_name: "linux".into(),
        cpu: Some("Example CPU".into()),
        mac_address: Some("AA:BB:CC:DD:EE:FF".into()),
    };
    let other_mac = DeviceInfo {
        mac_address: Some("AA:BB:CC:DD:EE:00".into()),
        ..base.clone()
    };
    let other_host = DeviceInfo {
        hostname: "host-b".into(),
        ..base.clone()
    };
    assert_ne!(base.fingerprint(), other_mac.fingerprint());
    assert_ne!(base.fingerprint(), other_host.fingerprint());
}

#[test]
fn degraded_fingerprint_uses_hostname_only() {
    let no_cpu = DeviceInfo {
        hostname: "host-a".into(),
        os_name: "linux".into(),
        cpu: None,
        mac_address: Some("AA:BB:CC:DD:EE:FF".into()),
    };
    let no_mac = DeviceInfo {
        hostname: "host-a".into(),
        os_name: "windows".into(),
        cpu: Some("Example CPU".into()),
        mac_address: None,
    };
    // sha256("host-a")
    assert_eq!(no_cpu.fingerprint(), no_mac.fingerprint());
    assert_eq!(no_cpu.fingerprint().as_str().len(), 64);
}

#[test]
fn parse_rejects_short_ids() {
    let short = "a".repeat(MIN_FINGERPRINT_LEN - 1);
    assert!(matches!(
        Fingerprint::parse(&short),
        Err(LicenseError::InvalidFingerprint(_))
    ));
    assert!(Fingerprint::parse("").is_err());
}

#[test]
fn parse_rejects_whitespace() {
    assert!(Fingerprint::parse("abcd efgh ijkl").is_err());
    assert!(Fingerprint::parse("abcdefgh\n").is_err());
}

#[test]
fn parse_accepts_mac_style_ids() {
    assert!(Fingerprint::parse("AA:BB:CC:DD:EE:FF").is_ok());
}

#[test]
fn fingerprint_serializes_as_plain_string() {
    let fp = Fingerprint::parse("abcdef0123456789").unwrap();
    assert_eq!(serde_json::to_string(&fp).unwrap(), "\"abcdef0123456789\"");
    assert_eq!(fp.to_string(), "abcdef0123456789");
}
