//! # Session Registry
//!
//! Opens, refreshes and revokes access/refresh token sessions for
//! authenticated principals.
//!
//! The caller has already established *who* the principal is (password
//! verification for merchants, a bound activation code for devices,
//! both upstream of this core). This service only turns "authentication
//! succeeded for principal X" into durable credentials.
//!
//! A session found `ACTIVE` whose access token has lapsed is
//! usable-for-refresh-only; this registry never promotes state on read:
//! only the sweeper writes `EXPIRED`, only `revoke` writes `REVOKED`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AuthResult;
use crate::jwt::TokenIssuer;
use pairkit_core::{validation, PairingError, Session, SessionStatus, TokenKind};
use pairkit_db::{Database, DbError, SessionRepository};

/// Response of a successful login: OAuth2-style grant plus the session
/// handle.
#[derive(Debug, Clone, Serialize)]
pub struct LoginGrant {
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Response of a successful refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshGrant {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// The session registry service.
pub struct SessionService {
    sessions: SessionRepository,
    issuer: TokenIssuer,
}

impl SessionService {
    /// Creates a new session service.
    ///
    /// The [`TokenIssuer`] is built once at process start and handed in;
    /// this service is the only caller that mints credentials.
    pub fn new(db: &Database, issuer: TokenIssuer) -> Self {
        SessionService {
            sessions: db.sessions(),
            issuer,
        }
    }

    /// Opens a session for an authenticated principal.
    ///
    /// Mints an access/refresh pair, records the session and returns the
    /// grant. `device_ref`, `ip_address` and `user_agent` are bookkeeping
    /// for the audit trail.
    pub async fn login(
        &self,
        principal_id: &str,
        device_ref: Option<&str>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AuthResult<LoginGrant> {
        validation::validate_opaque_ref("principal_id", principal_id)?;

        let now = Utc::now();
        let pair = self.issuer.issue_pair(principal_id, device_ref, now)?;
        let session_id = Uuid::new_v4().to_string();

        let session = Session {
            session_id: session_id.clone(),
            principal_id: principal_id.to_string(),
            device_ref: device_ref.map(str::to_string),
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            access_token_expires_at: now + Duration::seconds(self.issuer.access_ttl_secs()),
            refresh_token_expires_at: now + Duration::seconds(self.issuer.refresh_ttl_secs()),
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            status: SessionStatus::Active,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        };

        self.sessions.insert(&session).await?;

        info!(
            session_id = %session_id,
            principal_id = %principal_id,
            "Session opened"
        );

        Ok(LoginGrant {
            session_id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: self.issuer.access_ttl_secs(),
        })
    }

    /// Exchanges a refresh token for a fresh access token.
    ///
    /// The token must verify (signature, structure, `refresh` kind) and its
    /// embedded expiry must still be open; the session it belongs to must
    /// exist and be usable. The read-time window check wins over sweeper
    /// state: a lapsed-but-unswept session is rejected all the same.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshGrant> {
        let now = Utc::now();

        let token = self.issuer.verify(refresh_token, now)?;
        if token.kind != TokenKind::Refresh {
            return Err(PairingError::Malformed("expected a refresh token".to_string()).into());
        }
        if token.expired {
            return Err(PairingError::Expired("refresh token".to_string()).into());
        }

        let session = self
            .sessions
            .get_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| PairingError::NotFound("session for refresh token".to_string()))?;

        session.check_refresh_usable(now)?;

        let access_token =
            self.issuer
                .issue_access(&session.principal_id, session.device_ref.as_deref(), now)?;
        let expires_at = now + Duration::seconds(self.issuer.access_ttl_secs());

        let replaced = self
            .sessions
            .replace_access_token(&session.session_id, &access_token, expires_at, now)
            .await?;
        if !replaced {
            // Revoked or swept between the check and the update; re-read
            // for the precise verdict.
            warn!(session_id = %session.session_id, "Session state changed during refresh");
            let verdict = match self.sessions.get_by_id(&session.session_id).await? {
                Some(current) => current
                    .check_refresh_usable(now)
                    .err()
                    .unwrap_or(PairingError::Revoked(session.session_id.clone())),
                None => PairingError::session_not_found(&session.session_id),
            };
            return Err(verdict.into());
        }

        info!(
            session_id = %session.session_id,
            principal_id = %session.principal_id,
            "Session refreshed"
        );

        Ok(RefreshGrant {
            access_token,
            expires_in: self.issuer.access_ttl_secs(),
        })
    }

    /// Looks up the session carrying an access token.
    pub async fn lookup_by_access_token(&self, access_token: &str) -> AuthResult<Option<Session>> {
        Ok(self.sessions.get_by_access_token(access_token).await?)
    }

    /// Looks up the session carrying a refresh token.
    pub async fn lookup_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> AuthResult<Option<Session>> {
        Ok(self.sessions.get_by_refresh_token(refresh_token).await?)
    }

    /// Gets a session by id.
    pub async fn get(&self, session_id: &str) -> AuthResult<Option<Session>> {
        Ok(self.sessions.get_by_id(session_id).await?)
    }

    /// Records activity on a session.
    pub async fn touch(&self, session_id: &str) -> AuthResult<()> {
        match self.sessions.touch(session_id, Utc::now()).await {
            Ok(()) => Ok(()),
            Err(DbError::NotFound { .. }) => {
                Err(PairingError::session_not_found(session_id).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revokes a session. Terminal: a revoked session is never reactivated.
    ///
    /// Idempotent on sessions already `REVOKED`/`EXPIRED`; unknown ids are
    /// `NotFound`.
    pub async fn revoke(&self, session_id: &str) -> AuthResult<()> {
        let now = Utc::now();

        if self.sessions.get_by_id(session_id).await?.is_none() {
            return Err(PairingError::session_not_found(session_id).into());
        }

        let transitioned = self.sessions.revoke_if_active(session_id, now).await?;
        if transitioned {
            info!(session_id = %session_id, "Session revoked");
        }
        Ok(())
    }

    /// Revokes every active session of a principal.
    ///
    /// Account/device reset path; pairs with
    /// `PairingService::invalidate_device_codes`.
    pub async fn revoke_all(&self, principal_id: &str) -> AuthResult<u64> {
        validation::validate_opaque_ref("principal_id", principal_id)?;

        let count = self
            .sessions
            .revoke_all_for_principal(principal_id, Utc::now())
            .await?;

        info!(principal_id = %principal_id, count = count, "Revoked all sessions");
        Ok(count)
    }

    /// Counts a principal's active sessions.
    pub async fn active_session_count(&self, principal_id: &str) -> AuthResult<i64> {
        validation::validate_opaque_ref("principal_id", principal_id)?;
        Ok(self.sessions.count_active_for_principal(principal_id).await?)
    }

    /// Verifies a bearer token without touching the registry.
    ///
    /// Convenience passthrough so adapters need only one handle.
    pub fn verify_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<crate::jwt::TokenInfo> {
        self.issuer.verify(token, now)
    }
}
