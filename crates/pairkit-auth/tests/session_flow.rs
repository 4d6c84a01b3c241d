//! Session issuance, refresh, revocation and the session sweep, driven
//! through the same surface an adapter would use.

mod common;

use chrono::{Duration, Utc};
use pairkit_auth::{AuthError, TokenIssuer};
use pairkit_core::{PairingError, SessionStatus, TokenKind};

fn expect_pairing(err: AuthError) -> PairingError {
    match err {
        AuthError::Pairing(e) => e,
        other => panic!("expected a pairing error, got: {other}"),
    }
}

#[tokio::test]
async fn login_issues_a_verifiable_grant() {
    let core = common::setup().await;
    let now = Utc::now();

    let grant = core
        .sessions
        .login("merchant-1", Some("dev-1"), Some("10.0.0.8"), Some("pos-terminal/1.2"))
        .await
        .unwrap();

    assert_eq!(grant.expires_in, core.config.access_ttl_secs);

    // Both tokens verify independently of the registry.
    let access = core.sessions.verify_token(&grant.access_token, now).unwrap();
    assert_eq!(access.principal_id, "merchant-1");
    assert_eq!(access.kind, TokenKind::Access);
    assert!(!access.expired);

    let refresh = core.sessions.verify_token(&grant.refresh_token, now).unwrap();
    assert_eq!(refresh.kind, TokenKind::Refresh);

    // The registry recorded the session with its bookkeeping.
    let session = core.sessions.get(&grant.session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.principal_id, "merchant-1");
    assert_eq!(session.device_ref.as_deref(), Some("dev-1"));
    assert_eq!(session.ip_address.as_deref(), Some("10.0.0.8"));
    assert!(session.access_token_expires_at <= session.refresh_token_expires_at);

    assert_eq!(core.sessions.active_session_count("merchant-1").await.unwrap(), 1);
}

#[tokio::test]
async fn sessions_are_discoverable_by_either_token() {
    let core = common::setup().await;

    let grant = core.sessions.login("merchant-1", None, None, None).await.unwrap();

    let by_access = core
        .sessions
        .lookup_by_access_token(&grant.access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_access.session_id, grant.session_id);

    let by_refresh = core
        .sessions
        .lookup_by_refresh_token(&grant.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_refresh.session_id, grant.session_id);

    assert!(core
        .sessions
        .lookup_by_access_token("unknown-token")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn refresh_rotates_the_access_token() {
    let core = common::setup().await;

    let grant = core.sessions.login("merchant-1", None, None, None).await.unwrap();

    let refreshed = core.sessions.refresh(&grant.refresh_token).await.unwrap();
    assert_ne!(refreshed.access_token, grant.access_token);
    assert_eq!(refreshed.expires_in, core.config.access_ttl_secs);

    // The registry follows: old access token is gone, new one resolves.
    assert!(core
        .sessions
        .lookup_by_access_token(&grant.access_token)
        .await
        .unwrap()
        .is_none());
    let session = core
        .sessions
        .lookup_by_access_token(&refreshed.access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.session_id, grant.session_id);
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn refresh_rejects_the_wrong_token_kind() {
    let core = common::setup().await;
    let grant = core.sessions.login("merchant-1", None, None, None).await.unwrap();

    // An access token is authentic but not exchangeable.
    let err = core.sessions.refresh(&grant.access_token).await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::Malformed(_)));

    let err = core.sessions.refresh("garbage").await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::Malformed(_)));
}

#[tokio::test]
async fn refresh_rejects_foreign_and_unknown_tokens() {
    let core = common::setup().await;
    core.sessions.login("merchant-1", None, None, None).await.unwrap();

    // Authentic kind and shape, but signed by someone else.
    let foreign_issuer = TokenIssuer::new("some-other-secret", 3600, 86400);
    let foreign = foreign_issuer.issue_refresh("merchant-1", None, Utc::now()).unwrap();
    let err = core.sessions.refresh(&foreign).await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::InvalidSignature));

    // Our signature, but no session carries this token.
    let own_issuer = TokenIssuer::new(&core.config.jwt_secret, 3600, 86400);
    let orphan = own_issuer.issue_refresh("merchant-1", None, Utc::now()).unwrap();
    let err = core.sessions.refresh(&orphan).await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::NotFound(_)));
}

#[tokio::test]
async fn revoked_sessions_stay_revoked() {
    let core = common::setup().await;
    let grant = core.sessions.login("merchant-1", None, None, None).await.unwrap();

    core.sessions.revoke(&grant.session_id).await.unwrap();

    let session = core.sessions.get(&grant.session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Revoked);

    // Terminal: the refresh token is dead.
    let err = core.sessions.refresh(&grant.refresh_token).await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::Revoked(_)));

    // Idempotent; unknown ids are NotFound.
    core.sessions.revoke(&grant.session_id).await.unwrap();
    let err = core.sessions.revoke("no-such-session").await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::NotFound(_)));
}

#[tokio::test]
async fn revoke_all_clears_a_principal() {
    let core = common::setup().await;

    core.sessions.login("merchant-1", None, None, None).await.unwrap();
    core.sessions.login("merchant-1", None, None, None).await.unwrap();
    let other = core.sessions.login("merchant-2", None, None, None).await.unwrap();

    assert_eq!(core.sessions.revoke_all("merchant-1").await.unwrap(), 2);
    assert_eq!(core.sessions.revoke_all("merchant-1").await.unwrap(), 0);

    assert_eq!(core.sessions.active_session_count("merchant-1").await.unwrap(), 0);
    // Unrelated principals are untouched.
    let session = core.sessions.get(&other.session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn touch_records_activity() {
    let core = common::setup().await;
    let grant = core.sessions.login("merchant-1", None, None, None).await.unwrap();

    let before = core.sessions.get(&grant.session_id).await.unwrap().unwrap();
    core.sessions.touch(&grant.session_id).await.unwrap();
    let after = core.sessions.get(&grant.session_id).await.unwrap().unwrap();

    assert!(after.last_activity_at >= before.last_activity_at);

    let err = core.sessions.touch("no-such-session").await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::NotFound(_)));
}

#[tokio::test]
async fn sweep_expires_sessions_only_past_both_windows() {
    let core = common::setup().await;
    let grant = core.sessions.login("merchant-1", None, None, None).await.unwrap();

    // Past the access window only: refresh-only, not sweepable.
    let mid = Utc::now() + Duration::seconds(core.config.access_ttl_secs) + Duration::hours(1);
    let report = core.sweeper.sweep(mid).await.unwrap();
    assert_eq!(report.sessions_expired, 0);

    // Past both windows: swept, once.
    let late = Utc::now() + Duration::seconds(core.config.refresh_ttl_secs) + Duration::hours(1);
    let report = core.sweeper.sweep(late).await.unwrap();
    assert_eq!(report.sessions_expired, 1);
    let report = core.sweeper.sweep(late).await.unwrap();
    assert_eq!(report.sessions_expired, 0);

    let session = core.sessions.get(&grant.session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Expired);

    // A swept session refuses refresh with the expiry verdict.
    let err = core.sessions.refresh(&grant.refresh_token).await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::Expired(_)));
}

#[tokio::test]
async fn pairing_and_login_compose_end_to_end() {
    // The full story: pair a device, grant it credentials, then reset the
    // device and watch both halves invalidate.
    let core = common::setup().await;

    let issued = core.pairing.issue(Some("dev-1"), None, None).await.unwrap();
    let bound = core.pairing.redeem(&issued.code, "fp-abc").await.unwrap();
    let device = bound.device_ref.as_deref().unwrap();

    let grant = core
        .sessions
        .login(device, Some(device), None, None)
        .await
        .unwrap();
    assert_eq!(core.sessions.active_session_count(device).await.unwrap(), 1);

    // Factory reset: codes die, sessions die.
    assert_eq!(core.pairing.invalidate_device_codes(device).await.unwrap(), 1);
    assert_eq!(core.sessions.revoke_all(device).await.unwrap(), 1);

    let err = core.sessions.refresh(&grant.refresh_token).await.unwrap_err();
    assert!(matches!(expect_pairing(err), PairingError::Revoked(_)));
    assert!(core.pairing.find_binding("fp-abc").await.unwrap().is_none());
}
