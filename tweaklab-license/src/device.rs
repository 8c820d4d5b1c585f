//! Device fingerprinting for account binding.
//!
//! Derives a stable pseudo-identity for the current machine from a set of
//! independent environment signals. The fingerprint is a best-effort
//! software signal, not a hardware root of trust: two distinct machines
//! with identical signal values will collide, and the only recovery for a
//! resulting false-positive lockout is an administrative HWID reset.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fmt;

/// Display length of a fingerprint (hex characters).
pub const FINGERPRINT_LEN: usize = 32;

/// Truncated length used in audit records.
pub const SHORT_LEN: usize = 8;

/// Substituted for any signal group that cannot be read.
const SENTINEL: &str = "unavailable";

/// Delimiter between signal groups, stable across releases.
const DELIMITER: &str = "|";

/// The environment signals a fingerprint is derived from.
///
/// Each group is independent: an unreadable group stays `None` and is
/// replaced with a fixed sentinel at digest time, so a constrained
/// environment still yields a usable (if weaker) fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSet {
    /// Hardware renderer identifier, if one is exposed.
    pub renderer: Option<String>,
    /// Primary display geometry (width x height).
    pub display: Option<String>,
    /// Resolved timezone name.
    pub timezone: Option<String>,
    /// Platform summary: OS, architecture, core count, memory class.
    pub platform: Option<String>,
    /// Agent string: OS, hostname and user.
    pub agent: Option<String>,
    /// Platform machine identifier, the strongest signal when present.
    pub machine_id: Option<String>,
}

impl SignalSet {
    /// Collects signals from the live environment. Never fails; groups that
    /// cannot be read are left unset.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            renderer: read_renderer(),
            display: read_display_geometry(),
            timezone: read_timezone(),
            platform: Some(platform_summary()),
            agent: Some(agent_string()),
            machine_id: read_machine_id(),
        }
    }

    /// Returns the groups in digest order, sentinel-substituted.
    fn groups(&self) -> [&str; 6] {
        fn g(s: &Option<String>) -> &str {
            s.as_deref().unwrap_or(SENTINEL)
        }
        // Field order is part of the fingerprint contract; do not reorder.
        [
            g(&self.renderer),
            g(&self.display),
            g(&self.timezone),
            g(&self.platform),
            g(&self.agent),
            g(&self.machine_id),
        ]
    }
}

/// A stable pseudo-identity for one device.
///
/// 32 hex characters derived deterministically from a [`SignalSet`]. Not
/// guaranteed globally unique; collisions are tolerated as a known
/// limitation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint {
    id: String,
}

impl DeviceFingerprint {
    /// Generates a fingerprint for the current device.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_signals(&SignalSet::collect())
    }

    /// Derives a fingerprint from an explicit signal set.
    ///
    /// Deterministic: the same signals always produce the same fingerprint,
    /// and the output length is fixed regardless of which groups are unset.
    #[must_use]
    pub fn from_signals(signals: &SignalSet) -> Self {
        let combined = signals.groups().join(DELIMITER);

        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let digest = hasher.finalize();

        let mut id = hex::encode(digest);
        id.truncate(FINGERPRINT_LEN);

        Self { id }
    }

    /// Wraps an already-derived fingerprint string (e.g. loaded from the
    /// lock store).
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns the fingerprint ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the truncated form used in audit records.
    ///
    /// Truncates on character boundaries so ids that arrived via
    /// [`from_id`](Self::from_id) or deserialization stay sliceable.
    #[must_use]
    pub fn short(&self) -> &str {
        match self.id.char_indices().nth(SHORT_LEN) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Reads a hardware renderer identifier, if the platform exposes one.
fn read_renderer() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        // PCI vendor/device of the first DRM card.
        let vendor = std::fs::read_to_string("/sys/class/drm/card0/device/vendor").ok()?;
        let device = std::fs::read_to_string("/sys/class/drm/card0/device/device").ok()?;
        Some(format!("{}:{}", vendor.trim(), device.trim()))
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("system_profiler")
            .args(["SPDisplaysDataType", "-detailLevel", "mini"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|out| {
                out.lines()
                    .find(|l| l.trim_start().starts_with("Chipset Model:"))
                    .map(|l| l.trim().to_string())
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Reads the primary display geometry, if available.
fn read_display_geometry() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/sys/class/graphics/fb0/virtual_size")
            .ok()
            .map(|s| s.trim().replace(',', "x"))
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Resolves the local timezone name.
fn read_timezone() -> Option<String> {
    if let Ok(tz) = env::var("TZ") {
        if !tz.is_empty() {
            return Some(tz);
        }
    }

    #[cfg(unix)]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if !tz.is_empty() {
                return Some(tz.to_string());
            }
        }
        // /etc/localtime is usually a symlink into the zoneinfo tree.
        if let Ok(target) = std::fs::read_link("/etc/localtime") {
            let target = target.to_string_lossy();
            if let Some(idx) = target.find("zoneinfo/") {
                return Some(target[idx + "zoneinfo/".len()..].to_string());
            }
        }
    }

    None
}

/// Builds the platform summary group: OS, arch, core count, memory class.
fn platform_summary() -> String {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    match memory_class_gb() {
        Some(mem) => format!(
            "{};{};{}c;{}g",
            env::consts::OS,
            env::consts::ARCH,
            cores,
            mem
        ),
        None => format!("{};{};{}c", env::consts::OS, env::consts::ARCH, cores),
    }
}

/// Total memory rounded up to the next power-of-two gigabyte, mirroring the
/// coarse "memory class" a browser would report.
fn memory_class_gb() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let kb: u64 = meminfo
            .lines()
            .find(|l| l.starts_with("MemTotal:"))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()?;
        let gb = kb.div_ceil(1024 * 1024);
        Some(gb.next_power_of_two())
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Builds the agent group: OS, hostname and user.
fn agent_string() -> String {
    let user = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| SENTINEL.to_string());
    format!("{}/{}@{}", env::consts::OS, user, get_hostname())
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the machine ID (platform-specific unique identifier).
fn read_machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
