//! # Session Repository
//!
//! Database operations for sessions.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                              │
//! │                                                                     │
//! │  1. OPEN                                                            │
//! │     └── insert() → Session { status: ACTIVE }                       │
//! │                                                                     │
//! │  2. USE                                                             │
//! │     └── get_by_access_token() / get_by_refresh_token()              │
//! │     └── touch() → bump last_activity_at                             │
//! │     └── replace_access_token() → refresh grant                      │
//! │                                                                     │
//! │  3. END (one of)                                                    │
//! │     └── revoke_if_active() → REVOKED (explicit, terminal)           │
//! │     └── sweep_expired()    → EXPIRED (both windows lapsed)          │
//! │                                                                     │
//! │  Rows are never deleted: the table is the audit trail.              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pairkit_core::Session;

const SELECT_COLUMNS: &str = "\
    session_id, principal_id, device_ref, access_token, refresh_token, \
    access_token_expires_at, refresh_token_expires_at, ip_address, \
    user_agent, status, last_activity_at, created_at, updated_at";

/// Repository for session database operations.
///
/// Sole owner of the `sessions` table.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a newly opened session.
    pub async fn insert(&self, session: &Session) -> DbResult<()> {
        debug!(
            session_id = %session.session_id,
            principal_id = %session.principal_id,
            "Inserting session"
        );

        sqlx::query(
            r#"
            INSERT INTO sessions (
                session_id, principal_id, device_ref,
                access_token, refresh_token,
                access_token_expires_at, refresh_token_expires_at,
                ip_address, user_agent, status,
                last_activity_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.principal_id)
        .bind(&session.device_ref)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.access_token_expires_at)
        .bind(session.refresh_token_expires_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.status)
        .bind(session.last_activity_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a session by id.
    pub async fn get_by_id(&self, session_id: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SELECT_COLUMNS} FROM sessions WHERE session_id = ?1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Gets a session by its access token.
    pub async fn get_by_access_token(&self, access_token: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SELECT_COLUMNS} FROM sessions WHERE access_token = ?1"
        ))
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Gets a session by its refresh token.
    pub async fn get_by_refresh_token(&self, refresh_token: &str) -> DbResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SELECT_COLUMNS} FROM sessions WHERE refresh_token = ?1"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Bumps a session's `last_activity_at`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - unknown session id
    pub async fn touch(&self, session_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                last_activity_at = ?2,
                updated_at = ?2
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session", session_id));
        }

        Ok(())
    }

    /// Installs a freshly minted access token on an active session.
    ///
    /// Used by the refresh flow; also counts as activity.
    ///
    /// ## Returns
    /// * `Ok(true)` - token replaced
    /// * `Ok(false)` - session is no longer `ACTIVE`
    pub async fn replace_access_token(
        &self,
        session_id: &str,
        access_token: &str,
        access_token_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(session_id = %session_id, "Replacing access token");

        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                access_token = ?2,
                access_token_expires_at = ?3,
                last_activity_at = ?4,
                updated_at = ?4
            WHERE session_id = ?1 AND status = 'ACTIVE'
            "#,
        )
        .bind(session_id)
        .bind(access_token)
        .bind(access_token_expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revokes a session: `ACTIVE` → `REVOKED` (terminal).
    ///
    /// ## Returns
    /// * `Ok(true)` - this call performed the transition
    /// * `Ok(false)` - the session was already `EXPIRED`/`REVOKED`
    pub async fn revoke_if_active(&self, session_id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = 'REVOKED',
                updated_at = ?2
            WHERE session_id = ?1 AND status = 'ACTIVE'
            "#,
        )
        .bind(session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revokes every active session of a principal (account/device reset).
    pub async fn revoke_all_for_principal(
        &self,
        principal_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(principal_id = %principal_id, "Revoking all sessions for principal");

        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = 'REVOKED',
                updated_at = ?2
            WHERE principal_id = ?1 AND status = 'ACTIVE'
            "#,
        )
        .bind(principal_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Bulk-expires every `ACTIVE` session whose access AND refresh windows
    /// have both elapsed.
    ///
    /// Sweeper batch: idempotent, never touches sessions still inside a
    /// window (an access-expired session is usable-for-refresh and stays
    /// `ACTIVE`).
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = 'EXPIRED',
                updated_at = ?1
            WHERE status = 'ACTIVE'
              AND access_token_expires_at < ?1
              AND refresh_token_expires_at < ?1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts a principal's `ACTIVE` sessions.
    pub async fn count_active_for_principal(&self, principal_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sessions
            WHERE principal_id = ?1 AND status = 'ACTIVE'
            "#,
        )
        .bind(principal_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
