//! Error types for the auth subsystem.

use thiserror::Error;

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur in the auth subsystem.
///
/// `Transport` and `Authority` are deliberately distinct: the first means
/// the authority could not be reached or answered garbage (retry may help),
/// the second is a business rejection the authority itself reported
/// (retrying with the same inputs will not help).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Network error or malformed authority response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Authority-reported rejection (bad credentials, bad key, bad session).
    #[error("authority rejected: {0}")]
    Authority(String),

    /// Actor lacks the capability for an administrative action.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    /// Admin mutation aimed at a username the store has never seen.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// Lock store I/O error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
