//! Package tier resolution from license key prefixes.
//!
//! The prefix of a license key (everything before the first `-`) selects a
//! tier from a fixed table. Unknown prefixes resolve to the lowest tier so
//! that keys the authority approved but this build does not recognize still
//! grant baseline access.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level encoded in a license key's prefix.
///
/// Rank 1 is the highest privilege. Ranks are used for display and sorting
/// only; no authorization decision compares ranks numerically. Variant
/// order matches rank order, so the derived `Ord` sorts by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    /// Full optimization suite.
    Elite,
    /// Overclocking bundle.
    OcBundle,
    /// Core system optimizations.
    Foundation,
    /// Streaming-focused optimizations.
    Stream,
    /// Dual-PC streaming setup.
    DualPc,
    /// CPU overclock only.
    CpuOc,
    /// RAM overclock only.
    RamOc,
    /// Diagnostic checkup, lowest privilege.
    Checkup,
}

impl PackageTier {
    /// All tiers in rank order.
    pub const ALL: [Self; 8] = [
        Self::Elite,
        Self::OcBundle,
        Self::Foundation,
        Self::Stream,
        Self::DualPc,
        Self::CpuOc,
        Self::RamOc,
        Self::Checkup,
    ];

    /// Returns the uppercase key prefix for this tier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Elite => "ELITE",
            Self::OcBundle => "OCBUNDLE",
            Self::Foundation => "FOUNDATION",
            Self::Stream => "STREAM",
            Self::DualPc => "DUALPC",
            Self::CpuOc => "CPUOC",
            Self::RamOc => "RAMOC",
            Self::Checkup => "CHECKUP",
        }
    }

    /// Returns the human-readable package name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Elite => "Elite Package",
            Self::OcBundle => "Overclock Bundle",
            Self::Foundation => "Foundation Package",
            Self::Stream => "Stream Package",
            Self::DualPc => "Dual PC Package",
            Self::CpuOc => "CPU Overclock",
            Self::RamOc => "RAM Overclock",
            Self::Checkup => "System Checkup",
        }
    }

    /// Returns the numeric rank (1 = highest privilege).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Elite => 1,
            Self::OcBundle => 2,
            Self::Foundation => 3,
            Self::Stream => 4,
            Self::DualPc => 5,
            Self::CpuOc => 6,
            Self::RamOc => 7,
            Self::Checkup => 8,
        }
    }

    /// Looks up a tier by its key prefix, case-insensitively.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let upper = prefix.trim().to_uppercase();
        Self::ALL.iter().copied().find(|t| t.code() == upper)
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Resolves a subscription key or bare prefix to a tier.
///
/// The string is uppercased and split on the first `-`; the left side is
/// looked up in the tier table. Unknown prefixes resolve to
/// [`PackageTier::Checkup`] rather than failing.
#[must_use]
pub fn resolve_tier(key_or_prefix: &str) -> PackageTier {
    let prefix = key_or_prefix
        .split_once('-')
        .map_or(key_or_prefix, |(p, _)| p);
    PackageTier::from_prefix(prefix).unwrap_or(PackageTier::Checkup)
}
