//! Device lock store: durable username → bound-fingerprint mapping with an
//! audit trail.
//!
//! The persisted collection is one JSON snapshot (accounts map plus admin
//! whitelist). Every mutation is a full read-modify-write of that snapshot
//! through a single persist path, so a mutation can never drop unrelated
//! fields of the same record or other records. Concurrent processes writing
//! the same snapshot are out of scope; last writer wins.

use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use tweaklab_license::{DeviceFingerprint, PackageTier};

/// Cap on retained login attempts per account; trimmed from the oldest end.
pub const MAX_LOGIN_ATTEMPTS: usize = 10;

/// Account standing. Banned accounts are refused by the login orchestrator
/// regardless of credential or fingerprint correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account may log in.
    Active,
    /// Account is refused entry.
    Banned,
}

impl AccountStatus {
    /// Returns the opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Banned,
            Self::Banned => Self::Active,
        }
    }
}

/// How a login attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Credentials and fingerprint both accepted.
    Success,
    /// Authority rejected the credentials.
    WrongPassword,
    /// Local fingerprint gate blocked the attempt before any remote call.
    FingerprintMismatch,
    /// Anything else worth recording.
    Other,
}

/// One immutable audit record. Purely diagnostic: attempts never influence
/// authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// When the attempt happened.
    pub timestamp: DateTime<Utc>,
    /// How it ended.
    pub outcome: AttemptOutcome,
    /// Source IP, or the unknown sentinel.
    pub ip: String,
    /// Observed fingerprint, truncated for display.
    pub observed: String,
    /// Expected fingerprint (truncated); recorded only for mismatches.
    pub expected: Option<String>,
}

/// A persisted account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Unique key.
    pub username: String,
    /// Stored for administrative visibility only; the authority is the
    /// source of truth for credentials.
    pub password_echo: String,
    /// Package tier, re-derived from the authority's subscription key on
    /// each successful login. Unset until the first confirmed login.
    pub tier: Option<PackageTier>,
    /// When the account was first seen locally.
    pub registered: DateTime<Utc>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
    /// Free-text identity annotation for admins.
    pub notes: Option<String>,
    /// Account standing.
    pub status: AccountStatus,
    /// Bound fingerprint; `None` only before the first successful login or
    /// registration.
    pub hwid: Option<DeviceFingerprint>,
    /// Whether the fingerprint gate is enforced for this account.
    pub hwid_locked: bool,
    /// Source IP of the last successful login.
    pub last_ip: Option<String>,
    /// Bounded audit trail, most recent last.
    pub login_attempts: Vec<LoginAttempt>,
    /// Lifetime successful login counter.
    pub total_logins: u64,
}

impl UserAccount {
    fn new(username: &str, password_echo: &str) -> Self {
        Self {
            username: username.to_string(),
            password_echo: password_echo.to_string(),
            tier: None,
            registered: Utc::now(),
            last_login: None,
            notes: None,
            status: AccountStatus::Active,
            hwid: None,
            hwid_locked: false,
            last_ip: None,
            login_attempts: Vec::new(),
            total_logins: 0,
        }
    }

    /// Returns true if the account is banned.
    #[must_use]
    pub fn is_banned(&self) -> bool {
        self.status == AccountStatus::Banned
    }

    /// Returns true if a fingerprint is bound and enforced.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.hwid_locked && self.hwid.is_some()
    }

    fn append_attempt(&mut self, attempt: LoginAttempt) {
        self.login_attempts.push(attempt);
        if self.login_attempts.len() > MAX_LOGIN_ATTEMPTS {
            let excess = self.login_attempts.len() - MAX_LOGIN_ATTEMPTS;
            self.login_attempts.drain(..excess);
        }
    }

    fn bind_if_unbound(&mut self, fingerprint: &DeviceFingerprint) {
        if self.hwid.is_none() {
            self.hwid = Some(fingerprint.clone());
            self.hwid_locked = true;
        }
    }
}

/// The whole persisted collection.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    accounts: BTreeMap<String, UserAccount>,
    /// Admin whitelist, stored lowercased. Distinct from the Owner identity,
    /// which is never persisted here.
    admins: BTreeSet<String>,
}

struct Inner {
    snapshot: Snapshot,
    path: Option<PathBuf>,
}

/// Durable store for account lock state and the admin whitelist.
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone)]
pub struct LockStore {
    inner: Arc<Mutex<Inner>>,
}

impl LockStore {
    /// Opens (or creates) a store backed by a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> AuthResult<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| AuthError::Storage(format!("failed to read lock store: {e}")))?;
            serde_json::from_str(&raw)?
        } else {
            Snapshot::default()
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                snapshot,
                path: Some(path),
            })),
        })
    }

    /// Opens an in-memory store (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                snapshot: Snapshot::default(),
                path: None,
            })),
        }
    }

    /// Returns a copy of one account.
    #[must_use]
    pub fn account(&self, username: &str) -> Option<UserAccount> {
        let inner = self.inner.lock().unwrap();
        inner.snapshot.accounts.get(username).cloned()
    }

    /// Returns copies of all accounts, ordered by username.
    #[must_use]
    pub fn accounts(&self) -> Vec<UserAccount> {
        let inner = self.inner.lock().unwrap();
        inner.snapshot.accounts.values().cloned().collect()
    }

    /// Creates (or rebinds) the account shell for a fresh registration.
    ///
    /// The registering device's fingerprint is bound immediately, not
    /// deferred to first login. The tier stays unset until the authority
    /// confirms a subscription on login.
    pub fn record_registration(
        &self,
        username: &str,
        password_echo: &str,
        fingerprint: &DeviceFingerprint,
    ) -> AuthResult<()> {
        self.mutate(|snapshot| {
            let account = snapshot
                .accounts
                .entry(username.to_string())
                .or_insert_with(|| UserAccount::new(username, password_echo));
            account.hwid = Some(fingerprint.clone());
            account.hwid_locked = true;
            info!("registered account {username}, bound to {}", fingerprint.short());
        })
    }

    /// Records a successful, authority-confirmed login.
    ///
    /// Creates the account if this username was previously unknown, binds
    /// the fingerprint if unbound, and re-derives the stored tier from the
    /// authority-returned subscription key.
    pub fn record_login_success(
        &self,
        username: &str,
        password_echo: &str,
        fingerprint: &DeviceFingerprint,
        ip: &str,
        tier: PackageTier,
    ) -> AuthResult<()> {
        self.mutate(|snapshot| {
            let account = snapshot
                .accounts
                .entry(username.to_string())
                .or_insert_with(|| UserAccount::new(username, password_echo));
            account.password_echo = password_echo.to_string();
            account.bind_if_unbound(fingerprint);
            account.tier = Some(tier);
            account.last_login = Some(Utc::now());
            account.last_ip = Some(ip.to_string());
            account.total_logins += 1;
            account.append_attempt(LoginAttempt {
                timestamp: Utc::now(),
                outcome: AttemptOutcome::Success,
                ip: ip.to_string(),
                observed: fingerprint.short().to_string(),
                expected: None,
            });
            debug!("login success for {username} ({} total)", account.total_logins);
        })
    }

    /// Records an authority credential rejection. No-op for unknown
    /// usernames: without an account there is nothing to audit against.
    pub fn record_wrong_password(
        &self,
        username: &str,
        fingerprint: &DeviceFingerprint,
        ip: &str,
    ) -> AuthResult<()> {
        self.mutate(|snapshot| {
            if let Some(account) = snapshot.accounts.get_mut(username) {
                account.append_attempt(LoginAttempt {
                    timestamp: Utc::now(),
                    outcome: AttemptOutcome::WrongPassword,
                    ip: ip.to_string(),
                    observed: fingerprint.short().to_string(),
                    expected: None,
                });
            }
        })
    }

    /// Records a fingerprint-gate rejection with both prints truncated.
    /// The account's standing is untouched.
    pub fn record_fingerprint_mismatch(
        &self,
        username: &str,
        observed: &DeviceFingerprint,
        expected: &DeviceFingerprint,
        ip: &str,
    ) -> AuthResult<()> {
        self.mutate(|snapshot| {
            if let Some(account) = snapshot.accounts.get_mut(username) {
                account.append_attempt(LoginAttempt {
                    timestamp: Utc::now(),
                    outcome: AttemptOutcome::FingerprintMismatch,
                    ip: ip.to_string(),
                    observed: observed.short().to_string(),
                    expected: Some(expected.short().to_string()),
                });
                debug!(
                    "fingerprint mismatch for {username}: observed {} expected {}",
                    observed.short(),
                    expected.short()
                );
            }
        })
    }

    /// Clears an account's fingerprint binding. The next successful login
    /// re-binds to the device it comes from. Idempotent.
    pub fn reset_hwid(&self, username: &str) -> AuthResult<()> {
        self.mutate_account(username, |account| {
            account.hwid = None;
            account.hwid_locked = false;
            info!("cleared fingerprint binding for {username}");
        })
    }

    /// Flips an account between active and banned; returns the new status.
    pub fn toggle_ban(&self, username: &str) -> AuthResult<AccountStatus> {
        let mut new_status = AccountStatus::Active;
        self.mutate_account(username, |account| {
            account.status = account.status.toggled();
            new_status = account.status;
            info!("account {username} is now {:?}", account.status);
        })?;
        Ok(new_status)
    }

    /// Replaces an account's admin notes.
    pub fn set_notes(&self, username: &str, notes: Option<String>) -> AuthResult<()> {
        self.mutate_account(username, |account| {
            account.notes = notes.clone();
        })
    }

    /// Wipes every account and the admin whitelist.
    pub fn clear_all(&self) -> AuthResult<()> {
        self.mutate(|snapshot| {
            snapshot.accounts.clear();
            snapshot.admins.clear();
            info!("cleared all lock store data");
        })
    }

    /// Returns true if the username is on the admin whitelist.
    #[must_use]
    pub fn is_whitelisted(&self, username: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.snapshot.admins.contains(&username.to_lowercase())
    }

    /// Adds a username to the admin whitelist.
    pub fn add_admin(&self, username: &str) -> AuthResult<()> {
        self.mutate(|snapshot| {
            snapshot.admins.insert(username.to_lowercase());
        })
    }

    /// Removes a username from the admin whitelist. No-op when absent.
    pub fn remove_admin(&self, username: &str) -> AuthResult<()> {
        self.mutate(|snapshot| {
            snapshot.admins.remove(&username.to_lowercase());
        })
    }

    /// Returns the admin whitelist, sorted.
    #[must_use]
    pub fn admins(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.snapshot.admins.iter().cloned().collect()
    }

    /// Runs one mutation against the whole snapshot and persists it.
    fn mutate<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> AuthResult<R> {
        let mut inner = self.inner.lock().unwrap();
        let result = f(&mut inner.snapshot);
        Self::persist(&inner)?;
        Ok(result)
    }

    /// Runs one mutation against a single existing account.
    fn mutate_account(
        &self,
        username: &str,
        f: impl FnOnce(&mut UserAccount),
    ) -> AuthResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .snapshot
            .accounts
            .get_mut(username)
            .ok_or_else(|| AuthError::UnknownAccount(username.to_string()))?;
        f(account);
        Self::persist(&inner)
    }

    fn persist(inner: &Inner) -> AuthResult<()> {
        let Some(path) = &inner.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AuthError::Storage(format!("failed to create store dir: {e}")))?;
        }

        let raw = serde_json::to_vec_pretty(&inner.snapshot)?;
        fs::write(path, raw)
            .map_err(|e| AuthError::Storage(format!("failed to write lock store: {e}")))
    }
}
