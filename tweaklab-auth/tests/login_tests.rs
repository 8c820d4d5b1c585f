mod common;

use common::{fingerprint, MockAuthority};
use tweaklab_auth::{
    AttemptOutcome, LockStore, LoginOrchestrator, LoginOutcome, RegisterOutcome,
};
use tweaklab_license::PackageTier;

const IP: &str = "203.0.113.7";

#[tokio::test]
async fn register_then_first_login_binds_and_grants_tier() {
    // Scenario A: register with a FOUNDATION key, then log in from the
    // same device.
    let store = LockStore::in_memory();
    let orchestrator = LoginOrchestrator::new(
        MockAuthority::entitled("FOUNDATION-ABC12345"),
        store.clone(),
    );
    let f1 = fingerprint("F1");

    let registered = orchestrator
        .register_from("alice", "hunter2", "FOUNDATION-ABC12345", &f1)
        .await
        .unwrap();
    assert_eq!(registered, RegisterOutcome::Created);

    // Tier stays unresolved until the authority confirms a login.
    assert_eq!(store.account("alice").unwrap().tier, None);

    let outcome = orchestrator
        .attempt_login_from("alice", "hunter2", &f1, IP)
        .await
        .unwrap();
    match outcome {
        LoginOutcome::Success {
            tier, display_name, ..
        } => {
            assert_eq!(tier, PackageTier::Foundation);
            assert_eq!(display_name, "Foundation Package");
        }
        other => panic!("expected success, got {other:?}"),
    }

    let account = store.account("alice").unwrap();
    assert_eq!(account.hwid, Some(f1));
    assert!(account.hwid_locked);
    assert_eq!(account.total_logins, 1);
}

#[tokio::test]
async fn mismatched_fingerprint_never_reaches_authority() {
    // Scenario B: alice is bound to F1 and tries from F2.
    let store = LockStore::in_memory();
    let client = MockAuthority::entitled("FOUNDATION-ABC12345");
    let f1 = fingerprint("F1");
    let f2 = fingerprint("F2");

    store.record_registration("alice", "pw", &f1).unwrap();

    let orchestrator = LoginOrchestrator::new(client, store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &f2, IP)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        LoginOutcome::HwidLocked {
            observed: f2.clone(),
            expected: f1.clone(),
        }
    );
    // The local gate short-circuits: no remote call at all.
    assert_eq!(orchestrator.session_client().total_login_calls(), 0);

    let account = store.account("alice").unwrap();
    let attempt = account.login_attempts.last().unwrap();
    assert_eq!(attempt.outcome, AttemptOutcome::FingerprintMismatch);
    assert_eq!(attempt.observed, f2.short());
    assert_eq!(attempt.expected.as_deref(), Some(f1.short()));
}

#[tokio::test]
async fn reset_then_login_rebinds_to_new_device() {
    // Scenario C, login half: after an admin reset, F2 succeeds and
    // re-binds.
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");
    let f2 = fingerprint("F2");

    store.record_registration("alice", "pw", &f1).unwrap();
    store.reset_hwid("alice").unwrap();

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::entitled("ELITE-XYZ99999"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &f2, IP)
        .await
        .unwrap();

    assert!(matches!(outcome, LoginOutcome::Success { .. }));
    let account = store.account("alice").unwrap();
    assert_eq!(account.hwid, Some(f2));
    assert!(account.hwid_locked);
}

#[tokio::test]
async fn transport_failure_appends_nothing() {
    // Scenario E: the session handshake itself fails.
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");
    store.record_registration("alice", "pw", &f1).unwrap();
    let before = store.account("alice").unwrap();

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::unreachable("connection refused"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &f1, IP)
        .await
        .unwrap();

    match outcome {
        LoginOutcome::TransportFailure { message } => {
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    // Account state unchanged: no attempt appended.
    assert_eq!(store.account("alice").unwrap(), before);
}

#[tokio::test]
async fn authority_rejection_appends_wrong_password() {
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");
    store.record_registration("alice", "pw", &f1).unwrap();

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::rejecting("invalid credentials"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "wrong", &f1, IP)
        .await
        .unwrap();

    match &outcome {
        LoginOutcome::InvalidCredentials { message } => {
            assert_eq!(message, "invalid credentials");
        }
        other => panic!("expected invalid credentials, got {other:?}"),
    }
    // Distinguishable from the transport case in user-facing copy too.
    assert!(outcome.user_message().contains("username and password"));

    let account = store.account("alice").unwrap();
    assert_eq!(
        account.login_attempts.last().unwrap().outcome,
        AttemptOutcome::WrongPassword
    );
}

#[tokio::test]
async fn rejection_for_unknown_account_appends_nothing() {
    let store = LockStore::in_memory();
    let orchestrator =
        LoginOrchestrator::new(MockAuthority::rejecting("invalid credentials"), store.clone());

    let outcome = orchestrator
        .attempt_login_from("ghost", "pw", &fingerprint("F1"), IP)
        .await
        .unwrap();

    assert!(matches!(outcome, LoginOutcome::InvalidCredentials { .. }));
    assert!(store.account("ghost").is_none());
}

#[tokio::test]
async fn zero_subscriptions_is_distinct_outcome() {
    let store = LockStore::in_memory();
    let orchestrator = LoginOrchestrator::new(MockAuthority::no_subscription(), store.clone());

    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &fingerprint("F1"), IP)
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::NoSubscription);
    // Not a success: no account is created.
    assert!(store.account("alice").is_none());
}

#[tokio::test]
async fn banned_account_refused_before_any_gate() {
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");
    store.record_registration("alice", "pw", &f1).unwrap();
    store.toggle_ban("alice").unwrap();

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::entitled("ELITE-XYZ99999"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &f1, IP)
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::Banned);
    assert_eq!(orchestrator.session_client().total_login_calls(), 0);
}

#[tokio::test]
async fn tier_comes_from_authority_key_not_typed_key() {
    // The user typed a FOUNDATION key once upon registration, but the
    // authority now reports an ELITE subscription.
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");
    store.record_registration("alice", "pw", &f1).unwrap();

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::entitled("elite-UPGRADED1"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &f1, IP)
        .await
        .unwrap();

    match outcome {
        LoginOutcome::Success { tier, .. } => assert_eq!(tier, PackageTier::Elite),
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(store.account("alice").unwrap().tier, Some(PackageTier::Elite));
}

#[tokio::test]
async fn first_login_for_unknown_username_creates_account() {
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::entitled("STREAM-ABCD1234"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("carol", "pw", &f1, IP)
        .await
        .unwrap();

    assert!(matches!(outcome, LoginOutcome::Success { .. }));
    let account = store.account("carol").unwrap();
    assert_eq!(account.hwid, Some(f1));
    assert_eq!(account.tier, Some(PackageTier::Stream));
    assert_eq!(account.total_logins, 1);
}

#[tokio::test]
async fn register_with_malformed_key_skips_network() {
    let store = LockStore::in_memory();
    let orchestrator =
        LoginOrchestrator::new(MockAuthority::entitled("ELITE-XYZ99999"), store.clone());

    let outcome = orchestrator
        .register_from("alice", "pw", "no_separator", &fingerprint("F1"))
        .await
        .unwrap();

    assert!(matches!(outcome, RegisterOutcome::Rejected { .. }));
    assert_eq!(orchestrator.session_client().total_register_calls(), 0);
    assert!(store.account("alice").is_none());
}

#[tokio::test]
async fn register_rejected_by_authority() {
    let store = LockStore::in_memory();
    let orchestrator =
        LoginOrchestrator::new(MockAuthority::rejecting("key already used"), store.clone());

    let outcome = orchestrator
        .register_from("alice", "pw", "ELITE-XYZ99999", &fingerprint("F1"))
        .await
        .unwrap();

    match outcome {
        RegisterOutcome::Rejected { message } => assert_eq!(message, "key already used"),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(store.account("alice").is_none());
}

#[tokio::test]
async fn hwid_locked_message_is_actionable_and_local() {
    let store = LockStore::in_memory();
    let f1 = fingerprint("F1");
    let f2 = fingerprint("F2");
    store.record_registration("alice", "pw", &f1).unwrap();

    let orchestrator =
        LoginOrchestrator::new(MockAuthority::entitled("ELITE-XYZ99999"), store.clone());
    let outcome = orchestrator
        .attempt_login_from("alice", "pw", &f2, IP)
        .await
        .unwrap();

    let message = outcome.user_message();
    assert!(message.contains("administrator"));
    assert!(message.contains(f1.short()));
    assert!(message.contains(f2.short()));
}
