//! # Expiry Sweeper
//!
//! Batch reclamation of stale rows: `UNUSED` codes past their window and
//! `ACTIVE` sessions whose access AND refresh windows have both elapsed.
//!
//! The sweeper is an explicit, externally triggered function: a cron job
//! or timer calls it on a schedule, and tests call it directly. There is
//! no implicit in-process timer. Each sweep is a bulk UPDATE: idempotent,
//! re-entrant, purely additive (nothing un-expires), and safe to run while
//! live redemptions and refreshes are in flight, because every reader also
//! applies its own read-time expiry check.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::AuthResult;
use pairkit_db::{ActivationCodeRepository, Database, SessionRepository};

/// What one sweep pass reclaimed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepReport {
    pub codes_expired: u64,
    pub sessions_expired: u64,
}

/// Batch expiry of stale codes and sessions.
#[derive(Debug, Clone)]
pub struct Sweeper {
    codes: ActivationCodeRepository,
    sessions: SessionRepository,
}

impl Sweeper {
    /// Creates a new sweeper over the given database.
    pub fn new(db: &Database) -> Self {
        Sweeper {
            codes: db.activation_codes(),
            sessions: db.sessions(),
        }
    }

    /// Expires every `UNUSED` activation code with `expires_at < now`.
    pub async fn sweep_expired_codes(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let count = self.codes.sweep_expired(now).await?;
        if count > 0 {
            info!(count = count, "Swept expired activation codes");
        }
        Ok(count)
    }

    /// Expires every `ACTIVE` session whose two token windows have both
    /// elapsed. Sessions that are only access-expired stay `ACTIVE`; they
    /// are still usable for refresh.
    pub async fn sweep_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let count = self.sessions.sweep_expired(now).await?;
        if count > 0 {
            info!(count = count, "Swept expired sessions");
        }
        Ok(count)
    }

    /// One full pass over both tables; the cron entry point.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AuthResult<SweepReport> {
        let report = SweepReport {
            codes_expired: self.sweep_expired_codes(now).await?,
            sessions_expired: self.sweep_expired_sessions(now).await?,
        };

        info!(
            codes_expired = report.codes_expired,
            sessions_expired = report.sessions_expired,
            "Sweep complete"
        );
        Ok(report)
    }
}
