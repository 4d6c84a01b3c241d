//! # Domain Types
//!
//! Core records of the pairing domain and their lifecycle state machines.
//!
//! ## Lifecycles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Record Lifecycles                            │
//! │                                                                     │
//! │  ActivationCode                      Session                        │
//! │                                                                     │
//! │   UNUSED ──────► BOUND                ACTIVE ──────► EXPIRED        │
//! │     │              │                    │       (sweeper, both      │
//! │     │ timeout or   │ explicit           │        windows lapsed)    │
//! │     │ attempts     │ invalidation       │                           │
//! │     ▼              ▼                    └──────────► REVOKED        │
//! │   EXPIRED ◄────────┘                        (explicit, terminal)    │
//! │   (terminal)                                                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both lifecycles replace the original system's separate soft-delete flag:
//! the status column is the single source of truth, with `EXPIRED` and
//! `REVOKED` as the terminal set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PairingError, PairingResult};

// =============================================================================
// Code Status
// =============================================================================

/// Lifecycle state of an activation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum CodeStatus {
    /// Issued, waiting for a device to redeem it.
    Unused,
    /// Redeemed: permanently tied to one device fingerprint.
    Bound,
    /// Timed out, burned, or invalidated. Terminal.
    Expired,
}

impl Default for CodeStatus {
    fn default() -> Self {
        CodeStatus::Unused
    }
}

// =============================================================================
// Activation Code
// =============================================================================

/// A one-time pairing secret issued to a point-of-sale device.
///
/// The `code` string is both the business key and the primary key; rows are
/// soft-retired through [`CodeStatus`], never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ActivationCode {
    /// 12-char uppercase-alphanumeric secret.
    pub code: String,

    /// Opaque device identifier this code was issued for. Nullable until a
    /// device-initiated flow supplies one.
    pub device_ref: Option<String>,

    /// Hardware fingerprint captured at redemption. Set iff status is
    /// [`CodeStatus::Bound`].
    pub fingerprint: Option<String>,

    /// Failed redemption attempts so far. Monotonically increasing.
    pub attempts: i64,

    /// Cap on failed attempts before the code is burned.
    pub max_attempts: i64,

    /// Lifecycle state.
    pub status: CodeStatus,

    /// When the code was issued.
    pub issued_at: DateTime<Utc>,

    /// Fixed at issuance; redemption after this instant fails.
    pub expires_at: DateTime<Utc>,

    /// When the code was redeemed. Set iff status is [`CodeStatus::Bound`].
    pub bound_at: Option<DateTime<Utc>>,

    /// Opaque operator id that requested the issuance (audit).
    pub created_by: Option<String>,

    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ActivationCode {
    /// Checks whether this code can be redeemed at `now`.
    ///
    /// ## Failure Ladder
    /// The checks run in a fixed order so the caller always sees the most
    /// specific verdict, and so the verdict is stable across the terminal
    /// transition (a code burned by exhaustion keeps answering
    /// `AttemptsExceeded`, not a generic "already used"):
    /// 1. status is `BOUND`              → [`PairingError::AlreadyUsed`]
    /// 2. `now` past `expires_at`        → [`PairingError::Expired`]
    /// 3. `attempts` at `max_attempts`   → [`PairingError::AttemptsExceeded`]
    /// 4. status is `EXPIRED` (invalidated or superseded inside its window)
    ///                                   → [`PairingError::AlreadyUsed`]
    ///
    /// This is the pure half of the pairing state machine; the durable side
    /// effects (flipping to `EXPIRED`, counting attempts) are applied by the
    /// pairing service.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> PairingResult<()> {
        if self.status == CodeStatus::Bound {
            return Err(PairingError::AlreadyUsed(self.code.clone()));
        }

        if self.is_expired_at(now) {
            return Err(PairingError::Expired(format!(
                "activation code {}",
                self.code
            )));
        }

        if self.attempts >= self.max_attempts {
            return Err(PairingError::AttemptsExceeded(self.code.clone()));
        }

        if self.status == CodeStatus::Expired {
            return Err(PairingError::AlreadyUsed(self.code.clone()));
        }

        Ok(())
    }

    /// Read-time expiry check. A code past `expires_at` is treated as
    /// expired regardless of whether the sweeper has written the status yet.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Redemption attempts left before the code is burned. Never negative.
    #[inline]
    pub fn attempts_remaining(&self) -> i64 {
        (self.max_attempts - self.attempts).max(0)
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    /// Tokens may be used (access) or exchanged (refresh).
    Active,
    /// Both token windows lapsed; set by the sweeper.
    Expired,
    /// Explicitly invalidated. Terminal, never reactivated.
    Revoked,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

// =============================================================================
// Session
// =============================================================================

/// One authenticated principal's login: an access/refresh token pair plus
/// bookkeeping. Rows are kept forever as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    /// UUID v4.
    pub session_id: String,

    /// Opaque merchant or device identity the tokens were issued to.
    pub principal_id: String,

    /// Opaque device identifier, when the login came from a paired device.
    pub device_ref: Option<String>,

    /// Short-lived signed bearer token.
    pub access_token: String,

    /// Long-lived signed token exchanged for fresh access tokens.
    pub refresh_token: String,

    /// Invariant: always <= `refresh_token_expires_at`.
    pub access_token_expires_at: DateTime<Utc>,

    pub refresh_token_expires_at: DateTime<Utc>,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    /// Lifecycle state.
    pub status: SessionStatus,

    /// Bumped by `touch` and by every successful refresh.
    pub last_activity_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Checks whether this session can still exchange its refresh token.
    ///
    /// An `ACTIVE` session whose access token has lapsed is usable for
    /// refresh only; that narrowing is the caller's concern; here only the
    /// refresh window and the lifecycle state matter. The window check reads
    /// the clock directly, so a session the sweeper has not visited yet is
    /// still rejected once past its refresh expiry.
    pub fn check_refresh_usable(&self, now: DateTime<Utc>) -> PairingResult<()> {
        match self.status {
            SessionStatus::Revoked => {
                return Err(PairingError::Revoked(self.session_id.clone()));
            }
            SessionStatus::Expired => {
                return Err(PairingError::Expired(format!(
                    "session {}",
                    self.session_id
                )));
            }
            SessionStatus::Active => {}
        }

        if now > self.refresh_token_expires_at {
            return Err(PairingError::Expired(format!(
                "session {}",
                self.session_id
            )));
        }

        Ok(())
    }

    /// True once both token windows have elapsed (the sweeper's criterion).
    #[inline]
    pub fn is_fully_lapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.access_token_expires_at && now > self.refresh_token_expires_at
    }
}

// =============================================================================
// Token Kind
// =============================================================================

/// Discriminates the two token flavors embedded in every token's claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer credential.
    Access,
    /// Long-lived credential exchangeable for fresh access tokens.
    Refresh,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_code(now: DateTime<Utc>) -> ActivationCode {
        ActivationCode {
            code: "AB12CD34EF56".to_string(),
            device_ref: Some("dev-1".to_string()),
            fingerprint: None,
            attempts: 0,
            max_attempts: 3,
            status: CodeStatus::Unused,
            issued_at: now,
            expires_at: now + Duration::hours(24),
            bound_at: None,
            created_by: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_fresh_code_is_redeemable() {
        let now = Utc::now();
        let code = sample_code(now);
        assert!(code.check_redeemable(now).is_ok());
        assert_eq!(code.attempts_remaining(), 3);
    }

    #[test]
    fn test_bound_code_is_already_used() {
        let now = Utc::now();
        let mut code = sample_code(now);
        code.status = CodeStatus::Bound;

        let err = code.check_redeemable(now).unwrap_err();
        assert!(matches!(err, PairingError::AlreadyUsed(_)));
    }

    #[test]
    fn test_expired_window_beats_attempts() {
        // Past the window AND out of attempts: the window verdict wins
        // because the ladder checks expiry first.
        let now = Utc::now();
        let mut code = sample_code(now);
        code.expires_at = now - Duration::seconds(1);
        code.attempts = 3;

        let err = code.check_redeemable(now).unwrap_err();
        assert!(matches!(err, PairingError::Expired(_)));
    }

    #[test]
    fn test_attempts_exhausted() {
        let now = Utc::now();
        let mut code = sample_code(now);
        code.attempts = 3;

        let err = code.check_redeemable(now).unwrap_err();
        assert!(matches!(err, PairingError::AttemptsExceeded(_)));
        assert_eq!(code.attempts_remaining(), 0);

        // The verdict survives the terminal flip.
        code.status = CodeStatus::Expired;
        let err = code.check_redeemable(now).unwrap_err();
        assert!(matches!(err, PairingError::AttemptsExceeded(_)));
    }

    #[test]
    fn test_superseded_code_reads_as_already_used() {
        // EXPIRED inside its window with attempts to spare: invalidation,
        // not timeout or exhaustion.
        let now = Utc::now();
        let mut code = sample_code(now);
        code.status = CodeStatus::Expired;

        let err = code.check_redeemable(now).unwrap_err();
        assert!(matches!(err, PairingError::AlreadyUsed(_)));
    }

    #[test]
    fn test_attempts_remaining_never_negative() {
        let now = Utc::now();
        let mut code = sample_code(now);
        code.attempts = 5;
        assert_eq!(code.attempts_remaining(), 0);
    }

    fn sample_session(now: DateTime<Utc>) -> Session {
        Session {
            session_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".to_string(),
            principal_id: "merchant-1".to_string(),
            device_ref: None,
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            access_token_expires_at: now + Duration::hours(1),
            refresh_token_expires_at: now + Duration::days(30),
            ip_address: None,
            user_agent: None,
            status: SessionStatus::Active,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_session_refresh_usable() {
        let now = Utc::now();
        let session = sample_session(now);
        assert!(session.check_refresh_usable(now).is_ok());
        assert!(!session.is_fully_lapsed(now));
    }

    #[test]
    fn test_revoked_session_rejected() {
        let now = Utc::now();
        let mut session = sample_session(now);
        session.status = SessionStatus::Revoked;

        let err = session.check_refresh_usable(now).unwrap_err();
        assert!(matches!(err, PairingError::Revoked(_)));
    }

    #[test]
    fn test_lapsed_refresh_window_rejected_before_sweep() {
        // Still ACTIVE on disk, but past the refresh window: read-time
        // check wins over sweeper state.
        let now = Utc::now();
        let mut session = sample_session(now);
        session.refresh_token_expires_at = now - Duration::seconds(1);

        let err = session.check_refresh_usable(now).unwrap_err();
        assert!(matches!(err, PairingError::Expired(_)));
    }

    #[test]
    fn test_fully_lapsed_needs_both_windows() {
        let now = Utc::now();
        let mut session = sample_session(now);
        session.access_token_expires_at = now - Duration::hours(1);

        // Access lapsed, refresh still open: not sweepable.
        assert!(!session.is_fully_lapsed(now));

        session.refresh_token_expires_at = now - Duration::seconds(1);
        assert!(session.is_fully_lapsed(now));
    }
}
