//! Error types for the license module.

use thiserror::Error;

/// License-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// License key does not have the expected `PREFIX-REST` shape.
    #[error("invalid license key format: {0}")]
    InvalidKeyFormat(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
