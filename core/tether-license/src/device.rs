//! Machine fingerprinting for license binding.
//!
//! The fingerprint is `hex(sha256(hostname:os:cpu:mac))`. It survives reboots
//! but changes when the host is renamed or the primary NIC is swapped, which
//! is the intended binding granularity.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fmt;
#[cfg(target_os = "linux")]
use std::path::Path;
use tracing::warn;

/// Minimum accepted fingerprint length at the issuing service.
pub const MIN_FINGERPRINT_LEN: usize = 8;

/// Information about the current machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Hostname.
    pub hostname: String,
    /// Operating system identifier.
    pub os_name: String,
    /// CPU identifier (model name where available).
    pub cpu: Option<String>,
    /// Hardware address of the first physical network interface.
    pub mac_address: Option<String>,
}

impl DeviceInfo {
    /// Collects information about the current machine.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            hostname: get_hostname(),
            os_name: env::consts::OS.to_string(),
            cpu: get_cpu_id(),
            mac_address: get_mac_address(),
        }
    }

    /// Derives the fingerprint for these attributes.
    ///
    /// If the CPU or NIC could not be read, the result degrades to a hash of
    /// the hostname alone.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let material = match (&self.cpu, &self.mac_address) {
            (Some(cpu), Some(mac)) => {
                [self.hostname.as_str(), self.os_name.as_str(), cpu, mac].join(":")
            }
            _ => {
                warn!("hardware attributes unavailable, using hostname-only fingerprint");
                self.hostname.clone()
            }
        };

        Fingerprint(hex::encode(Sha256::digest(material.as_bytes())))
    }
}

/// A machine identifier a license is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derives the fingerprint of the current machine. Never fails.
    #[must_use]
    pub fn derive() -> Self {
        DeviceInfo::collect().fingerprint()
    }

    /// Wraps a fingerprint received from elsewhere, applying the sanity check:
    /// at least [`MIN_FINGERPRINT_LEN`] printable ASCII characters, no whitespace.
    pub fn parse(raw: &str) -> LicenseResult<Self> {
        if raw.len() < MIN_FINGERPRINT_LEN {
            return Err(LicenseError::InvalidFingerprint(format!(
                "must be at least {MIN_FINGERPRINT_LEN} characters"
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_graphic()) {
            return Err(LicenseError::InvalidFingerprint(
                "must be printable ASCII without whitespace".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the fingerprint string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets a CPU identifier string.
fn get_cpu_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.starts_with("model name") || l.starts_with("Processor"))
                .and_then(|l| l.split(':').nth(1))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sysctl")
            .args(["-n", "machdep.cpu.brand_string"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(target_os = "windows")]
    {
        env::var("PROCESSOR_IDENTIFIER").ok()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Some(env::consts::ARCH.to_string())
    }
}

/// Gets the hardware address of the first physical network interface.
fn get_mac_address() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        first_hardware_mac(Path::new("/sys/class/net"))
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ifconfig")
            .arg("en0")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.trim_start().starts_with("ether "))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(str::to_uppercase)
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        // Would use GetAdaptersInfo on Windows in production
        None
    }
}

/// Picks the first NIC under a sysfs `class/net` root that is backed by a
/// device, in name order.
///
/// Bridges, veth pairs, tunnels and other virtual links have no `device`
/// entry, so they cannot move the fingerprint when they come and go.
#[cfg(target_os = "linux")]
fn first_hardware_mac(net_root: &Path) -> Option<String> {
    let mut names: Vec<String> = std::fs::read_dir(net_root)
        .ok()?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| net_root.join(name).join("device").exists())
        .collect();
    // read_dir order is unspecified
    names.sort();

    names.into_iter().find_map(|name| {
        std::fs::read_to_string(net_root.join(&name).join("address"))
            .ok()
            .map(|s| s.trim().to_uppercase())
            .filter(|mac| !mac.is_empty() && mac != "00:00:00:00:00:00")
    })
}
