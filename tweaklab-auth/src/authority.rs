//! Remote session client for the license authority.
//!
//! The authority is a black-box RPC target speaking form-encoded POSTs with
//! JSON responses. Every logical operation (login, register, license
//! validation) performs its own `init` handshake and uses the returned
//! session token exactly once: the authority treats concurrent reuse of one
//! session id as a conflict, so tokens are never cached across calls.

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Sentinel returned when the client IP cannot be resolved.
pub const UNKNOWN_IP: &str = "Unknown";

/// Default public IP-echo endpoint.
pub const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";

/// Authority endpoint configuration.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Application name registered with the authority.
    pub app_name: String,
    /// Owner identifier registered with the authority.
    pub owner_id: String,
    /// Application version sent during the init handshake.
    pub app_version: String,
    /// Base URL of the authority endpoint.
    pub base_url: String,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            app_name: "tweaklab".to_string(),
            owner_id: String::new(),
            app_version: "1.0".to_string(),
            base_url: "https://auth.tweaklab.gg/api/1.2/".to_string(),
        }
    }
}

/// Authority response envelope. Parsed once at this boundary; raw JSON
/// never crosses into the rest of the subsystem.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    sessionid: Option<String>,
    #[serde(default)]
    info: Option<AccountInfo>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    #[serde(default)]
    subscriptions: Vec<SubscriptionEntry>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEntry {
    #[serde(alias = "key")]
    subscription: String,
    #[serde(default)]
    expiry: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    timeleft: Option<i64>,
}

/// Outcome of a successful authority login call.
///
/// Zero active subscriptions is a distinct, non-error case: the credentials
/// were right but the account has no entitlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginGrant {
    /// Account has at least one active subscription; the first one is
    /// authoritative.
    Entitled {
        /// Subscription key as returned by the authority.
        subscription_key: String,
        /// Subscription expiry, when the authority reports one.
        expiry: Option<DateTime<Utc>>,
    },
    /// Credentials accepted but no active subscription.
    NoSubscription,
}

/// The seam between the login orchestrator and the remote authority.
///
/// Implemented by [`AuthorityClient`] in production and by test doubles in
/// the test suite.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Authenticates credentials against the authority.
    async fn login(&self, username: &str, password: &str) -> AuthResult<LoginGrant>;

    /// Registers a new account with a license key.
    async fn register(&self, username: &str, password: &str, license_key: &str)
        -> AuthResult<()>;

    /// Validates a license key without touching an account.
    async fn validate_license(&self, license_key: &str) -> AuthResult<()>;
}

/// HTTP client for the license authority.
pub struct AuthorityClient {
    config: AuthorityConfig,
    client: Client,
}

impl AuthorityClient {
    /// Creates a new authority client.
    #[must_use]
    pub fn new(config: AuthorityConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    /// Performs the init handshake and returns a fresh session token.
    ///
    /// Init failures, including an authority-side init rejection, surface as
    /// [`AuthError::Transport`]: the caller cannot fix them by changing
    /// credentials, only by retrying the whole operation.
    async fn init_session(&self) -> AuthResult<String> {
        debug!("initializing authority session");

        let response = self
            .post_form(&[
                ("type", "init"),
                ("name", &self.config.app_name),
                ("ownerid", &self.config.owner_id),
                ("ver", &self.config.app_version),
            ])
            .await?;

        if !response.success {
            return Err(AuthError::Transport(format!(
                "session init rejected: {}",
                response.message
            )));
        }

        response
            .sessionid
            .ok_or_else(|| AuthError::Transport("init response missing session id".to_string()))
    }

    /// Sends one form-encoded POST and parses the response envelope.
    async fn post_form(&self, params: &[(&str, &str)]) -> AuthResult<ApiResponse> {
        let response = self
            .client
            .post(&self.config.base_url)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("authority unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Transport(format!(
                "authority returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("malformed authority response: {e}")))
    }

    /// Parses the authority's expiry field (seconds since epoch).
    fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
        let secs: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

#[async_trait]
impl SessionClient for AuthorityClient {
    async fn login(&self, username: &str, password: &str) -> AuthResult<LoginGrant> {
        let session_id = self.init_session().await?;

        let response = self
            .post_form(&[
                ("type", "login"),
                ("username", username),
                ("pass", password),
                ("sessionid", &session_id),
                ("name", &self.config.app_name),
                ("ownerid", &self.config.owner_id),
            ])
            .await?;

        if !response.success {
            debug!("authority rejected login for {username}");
            return Err(AuthError::Authority(response.message));
        }

        let subscriptions = response
            .info
            .map(|info| info.subscriptions)
            .unwrap_or_default();

        // The first subscription is authoritative; the rest are ignored.
        match subscriptions.into_iter().next() {
            Some(sub) => Ok(LoginGrant::Entitled {
                subscription_key: sub.subscription,
                expiry: sub.expiry.as_deref().and_then(Self::parse_expiry),
            }),
            None => Ok(LoginGrant::NoSubscription),
        }
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        license_key: &str,
    ) -> AuthResult<()> {
        let session_id = self.init_session().await?;

        let response = self
            .post_form(&[
                ("type", "register"),
                ("username", username),
                ("pass", password),
                ("key", license_key),
                ("sessionid", &session_id),
                ("name", &self.config.app_name),
                ("ownerid", &self.config.owner_id),
            ])
            .await?;

        if response.success {
            Ok(())
        } else {
            debug!("authority rejected registration for {username}");
            Err(AuthError::Authority(response.message))
        }
    }

    async fn validate_license(&self, license_key: &str) -> AuthResult<()> {
        let session_id = self.init_session().await?;

        let response = self
            .post_form(&[
                ("type", "license"),
                ("key", license_key),
                ("sessionid", &session_id),
                ("name", &self.config.app_name),
                ("ownerid", &self.config.owner_id),
            ])
            .await?;

        if response.success {
            Ok(())
        } else {
            Err(AuthError::Authority(response.message))
        }
    }
}

/// Resolves the client's public IP via an echo endpoint.
///
/// Advisory only: never gates authorization, and any failure collapses to
/// the [`UNKNOWN_IP`] sentinel.
pub async fn resolve_client_ip(client: &Client, endpoint: &str) -> String {
    let result = async {
        let response = client.get(endpoint).send().await.ok()?;
        let text = response.text().await.ok()?;
        let ip = text.trim();
        if ip.is_empty() {
            None
        } else {
            Some(ip.to_string())
        }
    }
    .await;

    match result {
        Some(ip) => ip,
        None => {
            warn!("client IP resolution failed, recording {UNKNOWN_IP}");
            UNKNOWN_IP.to_string()
        }
    }
}
