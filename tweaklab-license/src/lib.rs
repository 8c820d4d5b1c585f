//! License tiers and device fingerprinting for TweakLab.
//!
//! This crate handles:
//! - Package tier resolution from license key prefixes
//! - License key shape validation (the remote authority owns validity)
//! - Device fingerprinting for account binding
//!
//! # Design Principles
//!
//! - **Authority-derived tiers**: the stored tier is always re-derived from
//!   the subscription key the authority returns, never from local state
//! - **Graceful degradation**: fingerprinting never fails; missing signals
//!   are replaced with a fixed sentinel
//! - **No network**: this crate is a pure leaf; all remote calls live in
//!   `tweaklab-auth`
//!
//! # License Key Format
//!
//! Keys are formatted as `PREFIX-REST`. The case-insensitive prefix selects
//! a [`PackageTier`]; the rest is opaque to this subsystem.

mod device;
mod error;
mod key;
mod tier;

pub use device::{DeviceFingerprint, SignalSet, FINGERPRINT_LEN, SHORT_LEN};
pub use error::{LicenseError, LicenseResult};
pub use key::LicenseKey;
pub use tier::{resolve_tier, PackageTier};
