//! Shared test helpers for the auth tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tweaklab_auth::{AuthError, AuthResult, LoginGrant, SessionClient};
use tweaklab_license::{DeviceFingerprint, SignalSet};

/// Scripted behavior for one mock authority.
#[derive(Debug, Clone)]
pub enum Script {
    /// Login succeeds with this subscription key.
    Entitled(String),
    /// Login succeeds but the account has no subscription.
    NoSubscription,
    /// Authority rejects with this message.
    Reject(String),
    /// Transport fails with this message.
    Transport(String),
}

/// A `SessionClient` double with call counters, so tests can assert that
/// local gates short-circuit before the network.
pub struct MockAuthority {
    script: Script,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
}

impl MockAuthority {
    pub fn entitled(subscription_key: &str) -> Self {
        Self::with_script(Script::Entitled(subscription_key.to_string()))
    }

    pub fn no_subscription() -> Self {
        Self::with_script(Script::NoSubscription)
    }

    pub fn rejecting(message: &str) -> Self {
        Self::with_script(Script::Reject(message.to_string()))
    }

    pub fn unreachable(message: &str) -> Self {
        Self::with_script(Script::Transport(message.to_string()))
    }

    pub fn with_script(script: Script) -> Self {
        Self {
            script,
            login_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
        }
    }

    pub fn total_login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn total_register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    fn resolve(&self) -> AuthResult<LoginGrant> {
        match &self.script {
            Script::Entitled(key) => Ok(LoginGrant::Entitled {
                subscription_key: key.clone(),
                expiry: None,
            }),
            Script::NoSubscription => Ok(LoginGrant::NoSubscription),
            Script::Reject(message) => Err(AuthError::Authority(message.clone())),
            Script::Transport(message) => Err(AuthError::Transport(message.clone())),
        }
    }
}

#[async_trait]
impl SessionClient for MockAuthority {
    async fn login(&self, _username: &str, _password: &str) -> AuthResult<LoginGrant> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.resolve()
    }

    async fn register(
        &self,
        _username: &str,
        _password: &str,
        _license_key: &str,
    ) -> AuthResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.resolve().map(|_| ())
    }

    async fn validate_license(&self, _license_key: &str) -> AuthResult<()> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.resolve().map(|_| ())
    }
}

/// Deterministic fingerprint distinct per seed.
pub fn fingerprint(seed: &str) -> DeviceFingerprint {
    DeviceFingerprint::from_signals(&SignalSet {
        machine_id: Some(seed.to_string()),
        ..SignalSet::default()
    })
}
