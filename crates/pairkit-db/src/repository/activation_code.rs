//! # Activation Code Repository
//!
//! Database operations for activation codes.
//!
//! ## The Atomic Bind
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Concurrent Redemption, One Winner                      │
//! │                                                                     │
//! │  Device A: redeem(CODE, fp-a)        Device B: redeem(CODE, fp-b)   │
//! │       │                                   │                         │
//! │       ▼                                   ▼                         │
//! │  UPDATE activation_codes             UPDATE activation_codes        │
//! │  SET status = 'BOUND', ...           SET status = 'BOUND', ...      │
//! │  WHERE code = ?                      WHERE code = ?                 │
//! │    AND status = 'UNUSED'               AND status = 'UNUSED'        │
//! │       │                                   │                         │
//! │       ▼                                   ▼                         │
//! │  rows_affected = 1  ✓ BOUND          rows_affected = 0  ✗           │
//! │                                      → AlreadyUsed                  │
//! │                                                                     │
//! │  The same statement is covered by the partial unique index          │
//! │  (fingerprint WHERE status='BOUND'), so a second live binding of    │
//! │  one fingerprint via a different code fails as a constraint hit     │
//! │  inside the identical atomic unit.                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use pairkit_core::ActivationCode;

const SELECT_COLUMNS: &str = "\
    code, device_ref, fingerprint, attempts, max_attempts, status, \
    issued_at, expires_at, bound_at, created_by, updated_at";

/// Repository for activation code database operations.
///
/// Sole owner of the `activation_codes` table.
#[derive(Debug, Clone)]
pub struct ActivationCodeRepository {
    pool: SqlitePool,
}

impl ActivationCodeRepository {
    /// Creates a new ActivationCodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivationCodeRepository { pool }
    }

    /// Inserts a freshly issued code.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on a code collision; the issue
    ///   flow re-draws and retries; this repository never loops itself.
    pub async fn insert(&self, record: &ActivationCode) -> DbResult<()> {
        debug!(code = %record.code, device_ref = ?record.device_ref, "Inserting activation code");

        sqlx::query(
            r#"
            INSERT INTO activation_codes (
                code, device_ref, fingerprint, attempts, max_attempts,
                status, issued_at, expires_at, bound_at, created_by, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&record.code)
        .bind(&record.device_ref)
        .bind(&record.fingerprint)
        .bind(record.attempts)
        .bind(record.max_attempts)
        .bind(record.status)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.bound_at)
        .bind(&record.created_by)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a code record by its code string.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<ActivationCode>> {
        let record = sqlx::query_as::<_, ActivationCode>(&format!(
            "SELECT {SELECT_COLUMNS} FROM activation_codes WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Finds the code currently bound to a fingerprint, if any.
    ///
    /// The partial unique index guarantees at most one row qualifies.
    pub async fn find_bound_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> DbResult<Option<ActivationCode>> {
        let record = sqlx::query_as::<_, ActivationCode>(&format!(
            "SELECT {SELECT_COLUMNS} FROM activation_codes \
             WHERE fingerprint = ?1 AND status = 'BOUND'"
        ))
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Attempts the UNUSED→BOUND transition for one code.
    ///
    /// This single conditional UPDATE is the row-scoped atomic unit of the
    /// whole pairing flow: the status guard rejects a code someone else won,
    /// and the partial unique fingerprint index rejects a fingerprint that
    /// is live elsewhere, both inside the same statement.
    ///
    /// ## Returns
    /// * `Ok(true)` - this caller won the transition
    /// * `Ok(false)` - the code was no longer `UNUSED` (race lost)
    /// * `Err(DbError::UniqueViolation)` - fingerprint already bound
    ///   elsewhere; the caller maps this to a conflict
    pub async fn bind_if_unused(
        &self,
        code: &str,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(code = %code, "Attempting UNUSED -> BOUND transition");

        let result = sqlx::query(
            r#"
            UPDATE activation_codes SET
                status = 'BOUND',
                fingerprint = ?2,
                bound_at = ?3,
                updated_at = ?3
            WHERE code = ?1 AND status = 'UNUSED'
            "#,
        )
        .bind(code)
        .bind(fingerprint)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Adds one failed redemption attempt to a code.
    ///
    /// Runs as its own auto-commit statement so the increment survives even
    /// when the enclosing redemption fails; repeated invalid attempts must
    /// reliably converge on exhaustion.
    pub async fn increment_attempts(&self, code: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE activation_codes SET
                attempts = attempts + 1,
                updated_at = ?2
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft-retires one code: any non-terminal status → `EXPIRED`.
    ///
    /// ## Returns
    /// * `Ok(true)` - the code was flipped by this call
    /// * `Ok(false)` - it was already `EXPIRED` (never un-expires)
    pub async fn expire(&self, code: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activation_codes SET
                status = 'EXPIRED',
                updated_at = ?2
            WHERE code = ?1 AND status != 'EXPIRED'
            "#,
        )
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Expires every `UNUSED` code held by a device.
    ///
    /// Issue-time supersede: enforces "one live code per device" before a
    /// fresh code is generated.
    pub async fn expire_unused_for_device(
        &self,
        device_ref: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE activation_codes SET
                status = 'EXPIRED',
                updated_at = ?2
            WHERE device_ref = ?1 AND status = 'UNUSED'
            "#,
        )
        .bind(device_ref)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Expires every `UNUSED` or `BOUND` code held by a device.
    ///
    /// Device-reset path. Idempotent: a second call finds nothing left to
    /// transition and returns 0.
    pub async fn expire_all_for_device(
        &self,
        device_ref: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(device_ref = %device_ref, "Expiring all codes for device");

        let result = sqlx::query(
            r#"
            UPDATE activation_codes SET
                status = 'EXPIRED',
                updated_at = ?2
            WHERE device_ref = ?1 AND status IN ('UNUSED', 'BOUND')
            "#,
        )
        .bind(device_ref)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Bulk-expires every `UNUSED` code whose window has lapsed.
    ///
    /// Sweeper batch. Purely additive (never un-expires), idempotent, and
    /// safe to run concurrently with live redemptions: a redemption racing
    /// this statement either loses the row (`AlreadyUsed` path) or already
    /// rejected the code by its own read-time expiry check.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE activation_codes SET
                status = 'EXPIRED',
                updated_at = ?1
            WHERE status = 'UNUSED' AND expires_at < ?1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts live (unused, unexpired) codes currently held by a device.
    pub async fn count_live_for_device(
        &self,
        device_ref: &str,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM activation_codes
            WHERE device_ref = ?1 AND status = 'UNUSED' AND expires_at >= ?2
            "#,
        )
        .bind(device_ref)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use pairkit_core::{CodeStatus, DEFAULT_MAX_ATTEMPTS};

    fn sample(code: &str, device_ref: Option<&str>, now: DateTime<Utc>) -> ActivationCode {
        ActivationCode {
            code: code.to_string(),
            device_ref: device_ref.map(str::to_string),
            fingerprint: None,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status: CodeStatus::Unused,
            issued_at: now,
            expires_at: now + Duration::hours(24),
            bound_at: None,
            created_by: None,
            updated_at: now,
        }
    }

    async fn repo() -> ActivationCodeRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .activation_codes()
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", Some("dev-1"), now))
            .await
            .unwrap();

        let found = repo.get_by_code("AAAABBBBCCCC").await.unwrap().unwrap();
        assert_eq!(found.status, CodeStatus::Unused);
        assert_eq!(found.device_ref.as_deref(), Some("dev-1"));
        assert_eq!(found.attempts, 0);
        assert!(found.bound_at.is_none());

        assert!(repo.get_by_code("ZZZZZZZZZZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", None, now)).await.unwrap();

        let err = repo
            .insert(&sample("AAAABBBBCCCC", None, now))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("code"), "got: {err}");
    }

    #[tokio::test]
    async fn test_bind_admits_exactly_one_transition() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", None, now)).await.unwrap();

        assert!(repo.bind_if_unused("AAAABBBBCCCC", "fp-1", now).await.unwrap());
        // Second transition attempt observes the status guard.
        assert!(!repo.bind_if_unused("AAAABBBBCCCC", "fp-2", now).await.unwrap());

        let found = repo.get_by_code("AAAABBBBCCCC").await.unwrap().unwrap();
        assert_eq!(found.status, CodeStatus::Bound);
        assert_eq!(found.fingerprint.as_deref(), Some("fp-1"));
        assert!(found.bound_at.is_some());
    }

    #[tokio::test]
    async fn test_fingerprint_unique_among_bound_rows() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", None, now)).await.unwrap();
        repo.insert(&sample("DDDDEEEEFFFF", None, now)).await.unwrap();

        assert!(repo.bind_if_unused("AAAABBBBCCCC", "fp-1", now).await.unwrap());

        // Same fingerprint via a different code: the partial index fires.
        let err = repo
            .bind_if_unused("DDDDEEEEFFFF", "fp-1", now)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("fingerprint"), "got: {err}");

        // The loser is still UNUSED; the index only constrains BOUND rows.
        let loser = repo.get_by_code("DDDDEEEEFFFF").await.unwrap().unwrap();
        assert_eq!(loser.status, CodeStatus::Unused);

        // Once the first binding is retired, the fingerprint frees up.
        repo.expire("AAAABBBBCCCC", now).await.unwrap();
        assert!(repo.bind_if_unused("DDDDEEEEFFFF", "fp-1", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_is_terminal() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", None, now)).await.unwrap();

        assert!(repo.expire("AAAABBBBCCCC", now).await.unwrap());
        assert!(!repo.expire("AAAABBBBCCCC", now).await.unwrap());

        // No transition leaves EXPIRED.
        assert!(!repo.bind_if_unused("AAAABBBBCCCC", "fp-1", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_only_touches_lapsed_unused() {
        let repo = repo().await;
        let now = Utc::now();

        let mut lapsed = sample("AAAABBBBCCCC", None, now);
        lapsed.expires_at = now - Duration::hours(1);
        repo.insert(&lapsed).await.unwrap();

        let mut lapsed_bound = sample("DDDDEEEEFFFF", None, now);
        lapsed_bound.expires_at = now - Duration::hours(1);
        repo.insert(&lapsed_bound).await.unwrap();
        repo.bind_if_unused("DDDDEEEEFFFF", "fp-1", now).await.unwrap();

        repo.insert(&sample("GGGGHHHHIIII", None, now)).await.unwrap();

        assert_eq!(repo.sweep_expired(now).await.unwrap(), 1);
        // Idempotent: nothing left on the second pass.
        assert_eq!(repo.sweep_expired(now).await.unwrap(), 0);

        let bound = repo.get_by_code("DDDDEEEEFFFF").await.unwrap().unwrap();
        assert_eq!(bound.status, CodeStatus::Bound);
        let fresh = repo.get_by_code("GGGGHHHHIIII").await.unwrap().unwrap();
        assert_eq!(fresh.status, CodeStatus::Unused);
    }

    #[tokio::test]
    async fn test_device_expiry_scopes() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", Some("dev-1"), now))
            .await
            .unwrap();
        repo.insert(&sample("DDDDEEEEFFFF", Some("dev-1"), now))
            .await
            .unwrap();
        repo.bind_if_unused("DDDDEEEEFFFF", "fp-1", now).await.unwrap();
        repo.insert(&sample("GGGGHHHHIIII", Some("dev-2"), now))
            .await
            .unwrap();

        // Supersede only touches UNUSED rows of that device.
        assert_eq!(repo.expire_unused_for_device("dev-1", now).await.unwrap(), 1);

        // Reset also takes the bound one down; other devices untouched.
        assert_eq!(repo.expire_all_for_device("dev-1", now).await.unwrap(), 1);
        assert_eq!(repo.expire_all_for_device("dev-1", now).await.unwrap(), 0);

        let other = repo.get_by_code("GGGGHHHHIIII").await.unwrap().unwrap();
        assert_eq!(other.status, CodeStatus::Unused);
    }

    #[tokio::test]
    async fn test_count_live_for_device() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&sample("AAAABBBBCCCC", Some("dev-1"), now))
            .await
            .unwrap();
        let mut lapsed = sample("DDDDEEEEFFFF", Some("dev-1"), now);
        lapsed.expires_at = now - Duration::hours(1);
        repo.insert(&lapsed).await.unwrap();

        assert_eq!(repo.count_live_for_device("dev-1", now).await.unwrap(), 1);
        assert_eq!(repo.count_live_for_device("dev-2", now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unanticipated_errors_stay_typed() {
        // Sanity check on the sqlx -> DbError mapping for plain failures.
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err: DbError = sqlx::query("SELECT * FROM missing_table")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }
}
