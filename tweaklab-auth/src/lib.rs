//! Device-bound authentication and session subsystem for TweakLab.
//!
//! Users authenticate against a remote license authority, their access tier
//! is derived from the subscription key the authority returns, and each
//! account is bound to the first device that logs into it.
//!
//! # Components
//!
//! - **Session client** ([`AuthorityClient`]): fresh-session-per-operation
//!   RPC to the license authority, behind the [`SessionClient`] trait
//! - **Lock store** ([`LockStore`]): durable username → fingerprint binding
//!   with a bounded audit trail
//! - **Orchestrator** ([`LoginOrchestrator`]): local gates first, then the
//!   remote call, producing one structured [`LoginOutcome`]
//! - **Admin service** ([`AdminService`]): ban/unban, lock reset and
//!   whitelist management, gated by the Owner identity
//!
//! # Example
//!
//! ```no_run
//! use tweaklab_auth::{AuthorityClient, AuthorityConfig, LockStore, LoginOrchestrator};
//!
//! # async fn demo() -> tweaklab_auth::AuthResult<()> {
//! let client = AuthorityClient::new(AuthorityConfig::default());
//! let store = LockStore::open("accounts.json")?;
//! let orchestrator = LoginOrchestrator::new(client, store);
//!
//! let outcome = orchestrator.attempt_login("alice", "hunter2").await?;
//! println!("{}", outcome.user_message());
//! # Ok(())
//! # }
//! ```

mod admin;
mod authority;
mod error;
mod login;
mod store;

pub use admin::{AdminService, OwnerIdentity};
pub use authority::{
    resolve_client_ip, AuthorityClient, AuthorityConfig, LoginGrant, SessionClient,
    DEFAULT_IP_ECHO_URL, UNKNOWN_IP,
};
pub use error::{AuthError, AuthResult};
pub use login::{LoginOrchestrator, LoginOutcome, RegisterOutcome};
pub use store::{
    AccountStatus, AttemptOutcome, LockStore, LoginAttempt, UserAccount, MAX_LOGIN_ATTEMPTS,
};
