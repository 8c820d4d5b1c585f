mod common;

use common::fingerprint;
use tweaklab_auth::{AccountStatus, AdminService, AuthError, LockStore, OwnerIdentity};

fn service() -> (AdminService, LockStore) {
    let store = LockStore::in_memory();
    let admin = AdminService::new(OwnerIdentity::new("owner"), store.clone());
    (admin, store)
}

#[test]
fn owner_is_always_admin() {
    let (admin, _) = service();
    assert!(admin.is_admin("owner"));
    assert!(admin.is_admin("OWNER"));
    assert!(admin.is_admin("Owner"));
    assert!(!admin.is_admin("alice"));
}

#[test]
fn whitelisted_user_is_admin() {
    let (admin, store) = service();
    store.add_admin("bob").unwrap();
    assert!(admin.is_admin("bob"));
    assert!(admin.is_admin("BOB"));
}

#[test]
fn non_owner_admin_cannot_grow_whitelist() {
    // Scenario D: bob is a whitelisted admin but not the owner.
    let (admin, store) = service();
    store.add_admin("bob").unwrap();

    let denied = admin.add_admin("bob", "carol");
    assert!(matches!(denied, Err(AuthError::CapabilityDenied(_))));
    assert!(!store.is_whitelisted("carol"));

    admin.add_admin("owner", "carol").unwrap();
    assert!(store.is_whitelisted("carol"));
}

#[test]
fn non_owner_cannot_shrink_whitelist() {
    let (admin, store) = service();
    store.add_admin("bob").unwrap();
    store.add_admin("carol").unwrap();

    assert!(matches!(
        admin.remove_admin("bob", "carol"),
        Err(AuthError::CapabilityDenied(_))
    ));
    assert!(store.is_whitelisted("carol"));

    admin.remove_admin("owner", "carol").unwrap();
    assert!(!store.is_whitelisted("carol"));
    // Removing a non-present admin is a no-op.
    admin.remove_admin("owner", "carol").unwrap();
}

#[test]
fn owner_resets_hwid() {
    // Scenario C, admin half.
    let (admin, store) = service();
    store
        .record_registration("alice", "pw", &fingerprint("F1"))
        .unwrap();

    admin.reset_hwid("owner", "alice").unwrap();

    let account = store.account("alice").unwrap();
    assert_eq!(account.hwid, None);
    assert!(!account.hwid_locked);
}

#[test]
fn whitelisted_admin_resets_hwid() {
    let (admin, store) = service();
    store.add_admin("bob").unwrap();
    store
        .record_registration("alice", "pw", &fingerprint("F1"))
        .unwrap();

    admin.reset_hwid("bob", "alice").unwrap();
    assert_eq!(store.account("alice").unwrap().hwid, None);
}

#[test]
fn non_admin_cannot_reset_hwid() {
    let (admin, store) = service();
    store
        .record_registration("alice", "pw", &fingerprint("F1"))
        .unwrap();

    assert!(matches!(
        admin.reset_hwid("mallory", "alice"),
        Err(AuthError::CapabilityDenied(_))
    ));
    assert!(store.account("alice").unwrap().hwid.is_some());
}

#[test]
fn toggle_ban_roundtrip_via_service() {
    let (admin, store) = service();
    store
        .record_registration("alice", "pw", &fingerprint("F1"))
        .unwrap();

    assert_eq!(
        admin.toggle_ban("owner", "alice").unwrap(),
        AccountStatus::Banned
    );
    assert_eq!(
        admin.toggle_ban("owner", "alice").unwrap(),
        AccountStatus::Active
    );
}

#[test]
fn admin_mutation_on_unknown_account_errors() {
    let (admin, _) = service();
    assert!(matches!(
        admin.toggle_ban("owner", "ghost"),
        Err(AuthError::UnknownAccount(_))
    ));
    assert!(matches!(
        admin.reset_hwid("owner", "ghost"),
        Err(AuthError::UnknownAccount(_))
    ));
}

#[test]
fn notes_set_by_admin() {
    let (admin, store) = service();
    store
        .record_registration("alice", "pw", &fingerprint("F1"))
        .unwrap();

    admin
        .set_notes("owner", "alice", Some("priority customer".to_string()))
        .unwrap();
    assert_eq!(
        store.account("alice").unwrap().notes.as_deref(),
        Some("priority customer")
    );

    admin.set_notes("owner", "alice", None).unwrap();
    assert_eq!(store.account("alice").unwrap().notes, None);
}

#[test]
fn clear_all_is_owner_only() {
    let (admin, store) = service();
    store.add_admin("bob").unwrap();
    store
        .record_registration("alice", "pw", &fingerprint("F1"))
        .unwrap();

    assert!(matches!(
        admin.clear_all("bob"),
        Err(AuthError::CapabilityDenied(_))
    ));
    assert!(!store.accounts().is_empty());

    admin.clear_all("owner").unwrap();
    assert!(store.accounts().is_empty());
    assert!(store.admins().is_empty());
}
