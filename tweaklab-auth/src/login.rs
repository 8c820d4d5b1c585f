//! Login orchestration: composes the fingerprint gate, the lock store and
//! the remote session client into one structured outcome.
//!
//! Order matters. The banned check and the fingerprint gate are pure local
//! gates evaluated before any network call: a locked account attempted from
//! the wrong device is rejected cheaply and the authority never hears about
//! it.

use crate::authority::{resolve_client_ip, LoginGrant, SessionClient, DEFAULT_IP_ECHO_URL};
use crate::error::{AuthError, AuthResult};
use crate::store::LockStore;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use tweaklab_license::{resolve_tier, DeviceFingerprint, LicenseKey, PackageTier, SignalSet};

/// Structured result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Authority confirmed credentials and an active subscription.
    Success {
        /// Tier derived from the authority-returned subscription key.
        tier: PackageTier,
        /// Human-readable package name.
        display_name: &'static str,
        /// Subscription expiry, when reported.
        expiry: Option<DateTime<Utc>>,
    },
    /// Local fingerprint gate rejected the attempt; no remote call was made.
    HwidLocked {
        /// Fingerprint of the attempting device.
        observed: DeviceFingerprint,
        /// Fingerprint the account is bound to.
        expected: DeviceFingerprint,
    },
    /// Account is banned; nothing else was checked.
    Banned,
    /// Authority rejected the credentials.
    InvalidCredentials {
        /// Authority-reported reason.
        message: String,
    },
    /// Credentials accepted but the account has no active subscription.
    NoSubscription,
    /// Authority unreachable or answered garbage; retry may help.
    TransportFailure {
        /// Transport-level detail.
        message: String,
    },
}

impl LoginOutcome {
    /// User-facing copy for this outcome.
    ///
    /// Transport problems and credential rejections deliberately read
    /// differently ("check connection" vs "check credentials"), and the
    /// lock message is synthesized locally from truncated prints — it never
    /// echoes authority strings.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Success { display_name, .. } => {
                format!("Welcome back. {display_name} unlocked.")
            }
            Self::HwidLocked { observed, expected } => format!(
                "This account is locked to a different device (this device: {}, \
                 registered device: {}). Contact an administrator to reset the lock.",
                observed.short(),
                expected.short()
            ),
            Self::Banned => "This account has been banned.".to_string(),
            Self::InvalidCredentials { message } => {
                format!("Login rejected: {message}. Check your username and password.")
            }
            Self::NoSubscription => {
                "No active subscription on this account.".to_string()
            }
            Self::TransportFailure { .. } => {
                "Could not reach the license server. Check your connection and try again."
                    .to_string()
            }
        }
    }
}

/// Structured result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Account created and bound to the registering device.
    Created,
    /// Key or credentials rejected (locally or by the authority).
    Rejected {
        /// Rejection reason.
        message: String,
    },
    /// Authority unreachable; retry may help.
    TransportFailure {
        /// Transport-level detail.
        message: String,
    },
}

/// Composes fingerprinting, the session client, tier resolution and the
/// lock store into login/register flows.
///
/// Both the session client and the store are injected, so tests can run
/// against doubles without any module-level state.
pub struct LoginOrchestrator<C: SessionClient> {
    client: C,
    store: LockStore,
    http: Client,
    ip_echo_url: String,
}

impl<C: SessionClient> LoginOrchestrator<C> {
    /// Creates an orchestrator over a session client and lock store.
    #[must_use]
    pub fn new(client: C, store: LockStore) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            store,
            http,
            ip_echo_url: DEFAULT_IP_ECHO_URL.to_string(),
        }
    }

    /// Overrides the IP-echo endpoint (for tests).
    #[must_use]
    pub fn with_ip_echo_url(mut self, url: impl Into<String>) -> Self {
        self.ip_echo_url = url.into();
        self
    }

    /// Returns the lock store this orchestrator writes to.
    #[must_use]
    pub fn store(&self) -> &LockStore {
        &self.store
    }

    /// Returns the injected session client.
    #[must_use]
    pub fn session_client(&self) -> &C {
        &self.client
    }

    /// Attempts a login from the current device.
    ///
    /// Generates the device fingerprint and resolves the client IP
    /// (best-effort), then delegates to [`Self::attempt_login_from`].
    ///
    /// # Errors
    ///
    /// Returns an error only for lock store failures; remote and policy
    /// rejections are reported through [`LoginOutcome`].
    pub async fn attempt_login(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<LoginOutcome> {
        let fingerprint = DeviceFingerprint::from_signals(&SignalSet::collect());
        let ip = resolve_client_ip(&self.http, &self.ip_echo_url).await;
        self.attempt_login_from(username, password, &fingerprint, &ip)
            .await
    }

    /// Attempts a login with an explicit fingerprint and source IP.
    ///
    /// # Errors
    ///
    /// Returns an error only for lock store failures.
    pub async fn attempt_login_from(
        &self,
        username: &str,
        password: &str,
        fingerprint: &DeviceFingerprint,
        ip: &str,
    ) -> AuthResult<LoginOutcome> {
        let account = self.store.account(username);

        if let Some(account) = &account {
            if account.is_banned() {
                debug!("refusing banned account {username}");
                return Ok(LoginOutcome::Banned);
            }

            // Local fingerprint gate, checked before any remote call.
            if account.is_bound() {
                if let Some(expected) = &account.hwid {
                    if expected != fingerprint {
                        self.store.record_fingerprint_mismatch(
                            username,
                            fingerprint,
                            expected,
                            ip,
                        )?;
                        return Ok(LoginOutcome::HwidLocked {
                            observed: fingerprint.clone(),
                            expected: expected.clone(),
                        });
                    }
                }
            }
        }

        match self.client.login(username, password).await {
            Ok(LoginGrant::Entitled {
                subscription_key,
                expiry,
            }) => {
                // Always the authority-returned key, never the locally-typed
                // one: casing and format may differ, and stale local state
                // must not decide the tier.
                let tier = resolve_tier(&subscription_key);
                self.store
                    .record_login_success(username, password, fingerprint, ip, tier)?;
                info!("login success for {username}: {}", tier.display_name());
                Ok(LoginOutcome::Success {
                    tier,
                    display_name: tier.display_name(),
                    expiry,
                })
            }
            Ok(LoginGrant::NoSubscription) => Ok(LoginOutcome::NoSubscription),
            Err(AuthError::Authority(message)) => {
                if account.is_some() {
                    self.store.record_wrong_password(username, fingerprint, ip)?;
                }
                Ok(LoginOutcome::InvalidCredentials { message })
            }
            // No account-context certainty on transport failure: append
            // nothing, report retryable.
            Err(AuthError::Transport(message)) => {
                Ok(LoginOutcome::TransportFailure { message })
            }
            Err(other) => Err(other),
        }
    }

    /// Registers a new account from the current device.
    ///
    /// # Errors
    ///
    /// Returns an error only for lock store failures.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        license_key: &str,
    ) -> AuthResult<RegisterOutcome> {
        let fingerprint = DeviceFingerprint::from_signals(&SignalSet::collect());
        self.register_from(username, password, license_key, &fingerprint)
            .await
    }

    /// Registers a new account with an explicit fingerprint.
    ///
    /// The registration path does not consult the fingerprint gate (a new
    /// account has no binding yet); the registering device is bound
    /// immediately on success. The tier stays unset until the first
    /// authority-confirmed login.
    ///
    /// # Errors
    ///
    /// Returns an error only for lock store failures.
    pub async fn register_from(
        &self,
        username: &str,
        password: &str,
        license_key: &str,
        fingerprint: &DeviceFingerprint,
    ) -> AuthResult<RegisterOutcome> {
        // Cheap local shape check before spending a network round-trip.
        let key = match LicenseKey::parse(license_key) {
            Ok(key) => key,
            Err(e) => {
                return Ok(RegisterOutcome::Rejected {
                    message: e.to_string(),
                })
            }
        };

        match self.client.register(username, password, key.raw()).await {
            Ok(()) => {
                self.store
                    .record_registration(username, password, fingerprint)?;
                info!("registered {username}");
                Ok(RegisterOutcome::Created)
            }
            Err(AuthError::Authority(message)) => Ok(RegisterOutcome::Rejected { message }),
            Err(AuthError::Transport(message)) => {
                Ok(RegisterOutcome::TransportFailure { message })
            }
            Err(other) => Err(other),
        }
    }
}
