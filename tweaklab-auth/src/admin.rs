//! Privileged operations over the lock store, outside the login path.
//!
//! Capability model: the single Owner identity has unconditional admin
//! capability; whitelisted admins can mutate accounts but never the
//! whitelist itself. All operations are synchronous and make no network
//! calls.

use crate::error::{AuthError, AuthResult};
use crate::store::{AccountStatus, LockStore};
use tracing::info;

/// The fixed Owner identity, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentity(String);

impl OwnerIdentity {
    /// Wraps an owner username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    /// Returns the owner username.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive identity check.
    #[must_use]
    pub fn matches(&self, username: &str) -> bool {
        self.0.eq_ignore_ascii_case(username)
    }
}

/// Admin override service: ban/unban, lock reset, whitelist management.
pub struct AdminService {
    owner: OwnerIdentity,
    store: LockStore,
}

impl AdminService {
    /// Creates the service over an owner identity and lock store.
    #[must_use]
    pub fn new(owner: OwnerIdentity, store: LockStore) -> Self {
        Self { owner, store }
    }

    /// Returns true if the username is the Owner or on the admin whitelist.
    #[must_use]
    pub fn is_admin(&self, username: &str) -> bool {
        self.owner.matches(username) || self.store.is_whitelisted(username)
    }

    /// Grants admin capability. Owner-only.
    pub fn add_admin(&self, actor: &str, username: &str) -> AuthResult<()> {
        self.require_owner(actor)?;
        self.store.add_admin(username)?;
        info!("{actor} granted admin to {username}");
        Ok(())
    }

    /// Revokes admin capability. Owner-only; no-op when absent.
    pub fn remove_admin(&self, actor: &str, username: &str) -> AuthResult<()> {
        self.require_owner(actor)?;
        self.store.remove_admin(username)
    }

    /// Flips an account between active and banned; returns the new status.
    /// Toggling twice restores the original standing.
    pub fn toggle_ban(&self, actor: &str, username: &str) -> AuthResult<AccountStatus> {
        self.require_admin(actor)?;
        self.store.toggle_ban(username)
    }

    /// Clears an account's fingerprint binding so the next login re-binds.
    /// Idempotent: resetting an unbound account still leaves the lock off.
    pub fn reset_hwid(&self, actor: &str, username: &str) -> AuthResult<()> {
        self.require_admin(actor)?;
        self.store.reset_hwid(username)
    }

    /// Replaces an account's identity notes.
    pub fn set_notes(
        &self,
        actor: &str,
        username: &str,
        notes: Option<String>,
    ) -> AuthResult<()> {
        self.require_admin(actor)?;
        self.store.set_notes(username, notes)
    }

    /// Wipes all accounts and the whitelist. Owner-only.
    pub fn clear_all(&self, actor: &str) -> AuthResult<()> {
        self.require_owner(actor)?;
        self.store.clear_all()
    }

    fn require_owner(&self, actor: &str) -> AuthResult<()> {
        if self.owner.matches(actor) {
            Ok(())
        } else {
            Err(AuthError::CapabilityDenied(format!(
                "{actor} is not the owner"
            )))
        }
    }

    fn require_admin(&self, actor: &str) -> AuthResult<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(AuthError::CapabilityDenied(format!(
                "{actor} is not an administrator"
            )))
        }
    }
}
