//! License key shape validation.
//!
//! A key is `PREFIX-REST`. The prefix selects a [`PackageTier`]; the rest
//! carries no meaning to this subsystem and is only length-checked as a
//! basic sanity gate. The remote authority is the source of truth for
//! whether a key is actually valid.

use crate::error::{LicenseError, LicenseResult};
use crate::tier::{resolve_tier, PackageTier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of the part after the first dash.
const MIN_REST_LEN: usize = 4;

/// A shape-validated license key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseKey {
    raw: String,
}

impl LicenseKey {
    /// Parses a license key, validating shape only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing a `-` separator, has an empty
    /// prefix, or the remainder is implausibly short.
    pub fn parse(key: &str) -> LicenseResult<Self> {
        let key = key.trim();

        let Some((prefix, rest)) = key.split_once('-') else {
            return Err(LicenseError::InvalidKeyFormat(
                "key must contain a '-' separating prefix and body".to_string(),
            ));
        };

        if prefix.is_empty() {
            return Err(LicenseError::InvalidKeyFormat(
                "key prefix is empty".to_string(),
            ));
        }

        if rest.len() < MIN_REST_LEN {
            return Err(LicenseError::InvalidKeyFormat(format!(
                "key body must be at least {MIN_REST_LEN} characters"
            )));
        }

        Ok(Self {
            raw: key.to_string(),
        })
    }

    /// Returns the raw key string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the uppercased prefix.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.raw
            .split_once('-')
            .map_or(self.raw.as_str(), |(p, _)| p)
            .to_uppercase()
    }

    /// Resolves the tier this key's prefix selects.
    #[must_use]
    pub fn tier(&self) -> PackageTier {
        resolve_tier(&self.raw)
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
