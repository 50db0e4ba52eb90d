//! End-to-end session lifecycle tests
//!
//! Drive the resolver task through the full identity lifecycle with the
//! in-memory collaborators: fresh-device guest, sign-in with profile
//! binding, sign-out fallback, federated redirect completion, and the
//! ownership boundary between guest and profile records.

use std::sync::Arc;

use vizdeck_core::{
    AuthSession, DeviceStorage, Identity, MemoryStorage, OwnershipResolver, ResolverConfig,
    SubjectId, VisualizationTypeId, VizdeckError,
};
use vizdeck_runtime::{
    MemoryAuthProvider, MemoryProfileRepository, MemorySettingRepository, SessionRuntime,
};

struct Harness {
    auth: Arc<MemoryAuthProvider>,
    profiles: Arc<MemoryProfileRepository>,
    runtime: SessionRuntime,
}

fn start(auth: MemoryAuthProvider) -> Harness {
    start_with_storage(auth, Box::new(MemoryStorage::new()))
}

fn start_with_storage(auth: MemoryAuthProvider, storage: Box<dyn DeviceStorage>) -> Harness {
    let auth = Arc::new(auth);
    let profiles = Arc::new(MemoryProfileRepository::new());
    let runtime = SessionRuntime::start(
        ResolverConfig::testing(),
        auth.clone(),
        profiles.clone(),
        storage,
    )
    .expect("runtime starts");
    Harness {
        auth,
        profiles,
        runtime,
    }
}

// ----------------------------------------------------------------------------
// Guest Lifecycle
// ----------------------------------------------------------------------------

#[tokio::test]
async fn fresh_device_resolves_to_stable_guest() {
    let harness = start(MemoryAuthProvider::new());
    let mut handle = harness.runtime.handle();

    let first = handle.wait_resolved().await.unwrap();
    assert!(first.is_guest());
    assert_eq!(first.display_name(), "Guest");

    // Re-resolution reuses the persisted token
    let second = handle.resolve().await.unwrap();
    assert_eq!(first, second);

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn continue_as_guest_is_idempotent() {
    let harness = start(MemoryAuthProvider::new());
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    let first = handle.continue_as_guest().await.unwrap();
    let second = handle.continue_as_guest().await.unwrap();
    assert_eq!(first, second);

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn guest_token_survives_sign_in_and_out() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();

    let guest_before = handle.wait_resolved().await.unwrap();
    let token_before = guest_before.device_session_id().cloned().unwrap();

    handle.sign_in("ada", "pw").await.unwrap();
    let guest_after = handle.sign_out().await.unwrap();

    // Signing out does not clear the device token
    assert_eq!(guest_after.device_session_id(), Some(&token_before));

    harness.runtime.stop().await.unwrap();
}

// ----------------------------------------------------------------------------
// Sign-In and Profile Binding
// ----------------------------------------------------------------------------

#[tokio::test]
async fn sign_in_binds_profile_created_exactly_once() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", Some("ada@example.com"));
    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    let identity = handle.sign_in("ada", "pw").await.unwrap();
    assert!(identity.is_authenticated());
    assert_eq!(identity.subject_id(), SubjectId::new("u-42"));
    assert_eq!(identity.email(), Some("ada@example.com"));
    let profile_ref = identity.profile_ref().cloned().expect("profile bound");

    // Re-resolution finds the existing profile instead of creating again
    let again = handle.resolve().await.unwrap();
    assert_eq!(again.profile_ref(), Some(&profile_ref));
    assert_eq!(harness.profiles.create_calls(), 1);

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn invalid_credentials_leave_identity_unchanged() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();

    let guest = handle.wait_resolved().await.unwrap();

    let result = handle.sign_in("ada", "wrong").await;
    assert!(matches!(
        result,
        Err(VizdeckError::Auth(vizdeck_core::AuthError::InvalidCredential))
    ));
    assert_eq!(handle.identity(), Some(guest));

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn lost_profile_create_race_recovers_by_requery() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    harness.profiles.conflict_once();
    let identity = handle.sign_in("ada", "pw").await.unwrap();

    // The winner's record is found on re-query; the identity is still bound
    assert!(identity.profile_ref().is_some());

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn profile_failure_yields_authenticated_without_binding() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    // Create fails and the re-query finds nothing; the user is still
    // signed in, just without a bound profile
    harness.profiles.fail_creates();
    let identity = handle.sign_in("ada", "pw").await.unwrap();
    assert!(identity.is_authenticated());
    assert_eq!(identity.profile_ref(), None);

    // An unbound identity cannot own settings
    let settings = Arc::new(MemorySettingRepository::new());
    let mut ownership = OwnershipResolver::new(settings);
    let err = ownership
        .save(&identity, &VisualizationTypeId::new("sports"), "mine", "{}")
        .await
        .unwrap_err();
    assert_eq!(err, VizdeckError::UnboundProfile);

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_resolves_create_one_profile() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    // Session installed before the runtime starts, so startup resolution is
    // already authenticated
    auth.complete_redirect(AuthSession {
        subject_id: SubjectId::new("u-42"),
        display_name: "ada".to_string(),
        email: None,
    });

    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    let resolves = (0..4).map(|_| {
        let handle = harness.runtime.handle();
        async move { handle.resolve().await }
    });
    for identity in futures::future::join_all(resolves).await {
        assert!(identity.unwrap().is_authenticated());
    }
    assert_eq!(harness.profiles.create_calls(), 1);

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn refresh_profile_keeps_subject_and_binding() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    let signed_in = handle.sign_in("ada", "pw").await.unwrap();
    let refreshed = handle.refresh_profile().await.unwrap();
    assert_eq!(refreshed.subject_id(), signed_in.subject_id());
    assert_eq!(refreshed.profile_ref(), signed_in.profile_ref());

    // No-op for guests
    let guest = handle.sign_out().await.unwrap();
    let still_guest = handle.refresh_profile().await.unwrap();
    assert_eq!(guest, still_guest);

    harness.runtime.stop().await.unwrap();
}

// ----------------------------------------------------------------------------
// Sign-Out and Provider Events
// ----------------------------------------------------------------------------

#[tokio::test]
async fn sign_out_provider_error_still_yields_guest() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    handle.sign_in("ada", "pw").await.unwrap();
    harness.auth.fail_next_sign_out();

    let identity = handle.sign_out().await.unwrap();
    assert!(identity.is_guest());
    assert!(handle.identity().unwrap().is_guest());

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn redirect_completion_arrives_via_event_stream() {
    let harness = start(MemoryAuthProvider::new());
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();

    handle
        .sign_in_with_redirect(vizdeck_core::FederatedProvider::Google)
        .await
        .unwrap();
    // Still guest until the provider reports completion
    assert!(handle.identity().unwrap().is_guest());

    harness.auth.complete_redirect(AuthSession {
        subject_id: SubjectId::new("u-99"),
        display_name: "fed".to_string(),
        email: None,
    });

    let mut state = handle.subscribe();
    let resolved = state
        .wait_for(|s| s.identity().is_some_and(Identity::is_authenticated))
        .await
        .unwrap();
    assert_eq!(
        resolved.identity().unwrap().subject_id(),
        SubjectId::new("u-99")
    );

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn session_expiry_falls_back_to_guest() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();
    handle.wait_resolved().await.unwrap();
    handle.sign_in("ada", "pw").await.unwrap();

    harness.auth.expire_session();

    let mut state = handle.subscribe();
    let resolved = state
        .wait_for(|s| s.identity().is_some_and(Identity::is_guest))
        .await
        .unwrap();
    assert!(resolved.identity().unwrap().is_guest());

    harness.runtime.stop().await.unwrap();
}

// ----------------------------------------------------------------------------
// Ownership Boundary
// ----------------------------------------------------------------------------

#[tokio::test]
async fn guest_and_profile_settings_never_mix() {
    let auth = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
    let harness = start(auth);
    let mut handle = harness.runtime.handle();

    let settings = Arc::new(MemorySettingRepository::new());
    let mut ownership = OwnershipResolver::new(settings.clone());
    let type_id = VisualizationTypeId::new("sports");

    // Save as guest
    let guest = handle.wait_resolved().await.unwrap();
    let guest_record = ownership
        .save(&guest, &type_id, "mine", r#"{"team":"reds"}"#)
        .await
        .unwrap();

    // Sign in; the guest record is invisible under the profile filter
    let authed = handle.sign_in("ada", "pw").await.unwrap();
    ownership.reset();
    assert_eq!(ownership.load(&authed, &type_id).await.unwrap(), None);

    // Explicit claim re-tags the device record to the profile
    let token = guest.device_session_id().cloned().unwrap();
    let claimed = ownership
        .claim_device_records(&authed, &token)
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, guest_record.id);

    let loaded = ownership.load(&authed, &type_id).await.unwrap().unwrap();
    assert_eq!(loaded.config, r#"{"team":"reds"}"#);

    // And the old guest filter no longer matches anything
    assert_eq!(ownership.load(&guest, &type_id).await.unwrap(), None);

    harness.runtime.stop().await.unwrap();
}

#[tokio::test]
async fn save_after_load_updates_in_place() {
    let harness = start(MemoryAuthProvider::new());
    let mut handle = harness.runtime.handle();
    let guest = handle.wait_resolved().await.unwrap();

    let settings = Arc::new(MemorySettingRepository::new());
    let mut ownership = OwnershipResolver::new(settings.clone());
    let type_id = VisualizationTypeId::new("weather");

    let created = ownership
        .save(&guest, &type_id, "radar", r#"{"zoom":3}"#)
        .await
        .unwrap();
    let updated = ownership
        .save(&guest, &type_id, "radar", r#"{"zoom":5}"#)
        .await
        .unwrap();

    assert_eq!(created.id, updated.id);
    assert_eq!(settings.all().len(), 1);
    assert_eq!(settings.all()[0].config, r#"{"zoom":5}"#);

    harness.runtime.stop().await.unwrap();
}
