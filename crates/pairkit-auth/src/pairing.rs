//! # Pairing Service
//!
//! Activation code issuance, redemption and invalidation.
//!
//! ## Redemption Failure Ladder
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  redeem(code, fingerprint)                                          │
//! │       │                                                             │
//! │       ├── lookup by code ─────────────── absent → NotFound          │
//! │       ├── status BOUND / invalidated ─────────── → AlreadyUsed      │
//! │       ├── now > expires_at ──── flip EXPIRED ─── → Expired          │
//! │       ├── attempts exhausted ── flip EXPIRED ─── → AttemptsExceeded │
//! │       ├── fingerprint live elsewhere ── attempts+1 →                │
//! │       │                                   FingerprintConflict       │
//! │       └── conditional UNUSED→BOUND update                           │
//! │             ├── won  → BOUND, return record                         │
//! │             ├── lost → AlreadyUsed                                  │
//! │             └── fingerprint index hit ── attempts+1 →               │
//! │                                           FingerprintConflict       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Attempt increments run as their own statements and are committed even
//! when the redemption fails, so repeated invalid attempts converge on
//! `AttemptsExceeded` → `EXPIRED`.

use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use pairkit_core::{code, validation, ActivationCode, CodeStatus, PairingError};
use pairkit_db::{ActivationCodeRepository, Database};

/// How many collision re-draws `issue` tolerates before giving up. With a
/// 36^12 code space the second draw already almost never happens.
const MAX_CODE_REDRAWS: u32 = 8;

/// Issues, redeems and invalidates activation codes.
#[derive(Debug, Clone)]
pub struct PairingService {
    codes: ActivationCodeRepository,
    config: AuthConfig,
}

impl PairingService {
    /// Creates a new pairing service over the given database.
    pub fn new(db: &Database, config: AuthConfig) -> Self {
        PairingService {
            codes: db.activation_codes(),
            config,
        }
    }

    /// Issues a fresh activation code.
    ///
    /// If the device already holds `UNUSED` codes they are superseded
    /// (forced to `EXPIRED`) first (one live code per device). The code
    /// value is re-drawn on the (vanishingly rare) collision with an
    /// existing row.
    ///
    /// ## Arguments
    /// * `device_ref` - opaque device identifier; required when the
    ///   `require_device_ref` policy flag is set
    /// * `created_by` - opaque operator id for the audit column
    /// * `ttl` - code lifetime override; the configured default (24h)
    ///   when `None`
    pub async fn issue(
        &self,
        device_ref: Option<&str>,
        created_by: Option<&str>,
        ttl: Option<Duration>,
    ) -> AuthResult<ActivationCode> {
        match device_ref {
            Some(d) => validation::validate_opaque_ref("device_ref", d)?,
            None if self.config.require_device_ref => {
                return Err(PairingError::invalid_argument(
                    "device_ref",
                    "required by policy",
                )
                .into());
            }
            None => {}
        }
        if let Some(c) = created_by {
            validation::validate_opaque_ref("created_by", c)?;
        }

        let ttl = ttl.unwrap_or_else(|| Duration::seconds(self.config.code_ttl_secs));
        if ttl <= Duration::zero() {
            return Err(PairingError::invalid_argument("ttl", "must be positive").into());
        }

        let now = Utc::now();

        if let Some(device) = device_ref {
            let superseded = self.codes.expire_unused_for_device(device, now).await?;
            if superseded > 0 {
                info!(
                    device_ref = %device,
                    superseded = superseded,
                    "Superseded previously issued activation codes"
                );
            }
        }

        for _ in 0..MAX_CODE_REDRAWS {
            let record = ActivationCode {
                code: code::generate_code(&mut OsRng),
                device_ref: device_ref.map(str::to_string),
                fingerprint: None,
                attempts: 0,
                max_attempts: self.config.code_max_attempts,
                status: CodeStatus::Unused,
                issued_at: now,
                expires_at: now + ttl,
                bound_at: None,
                created_by: created_by.map(str::to_string),
                updated_at: now,
            };

            match self.codes.insert(&record).await {
                Ok(()) => {
                    info!(
                        code = %record.code,
                        device_ref = ?record.device_ref,
                        expires_at = %record.expires_at,
                        "Issued activation code"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_unique_violation_on("code") => {
                    warn!("Activation code collision, re-drawing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::Internal(format!(
            "no unique activation code after {MAX_CODE_REDRAWS} draws"
        )))
    }

    /// Redeems an activation code against a device fingerprint.
    ///
    /// On success the code is `BOUND` to the fingerprint and the record is
    /// returned; the caller reads the bound `device_ref` from it and then
    /// asks the session service for credentials. Failures follow the ladder
    /// in the module docs; concurrent redemptions of one code, or of one
    /// fingerprint via two codes, admit exactly one winner.
    pub async fn redeem(&self, offered_code: &str, fingerprint: &str) -> AuthResult<ActivationCode> {
        validation::validate_code_shape(offered_code)?;
        validation::validate_fingerprint(fingerprint)?;

        let now = Utc::now();

        let record = self
            .codes
            .get_by_code(offered_code)
            .await?
            .ok_or_else(|| PairingError::code_not_found(offered_code))?;

        if let Err(verdict) = record.check_redeemable(now) {
            match &verdict {
                PairingError::Expired(_) | PairingError::AttemptsExceeded(_) => {
                    // Burn the code on the way out; EXPIRED is terminal.
                    self.codes.expire(offered_code, now).await?;
                }
                _ => {}
            }
            warn!(code = %offered_code, %verdict, "Redemption rejected");
            return Err(verdict.into());
        }

        // Friendly-path conflict check; the partial unique index inside the
        // bind below remains the authority under races.
        if let Some(holder) = self.codes.find_bound_by_fingerprint(fingerprint).await? {
            return self
                .fail_fingerprint_conflict(offered_code, fingerprint, &holder.code, now)
                .await;
        }

        match self.codes.bind_if_unused(offered_code, fingerprint, now).await {
            Ok(true) => {}
            Ok(false) => {
                // Lost the UNUSED→BOUND race.
                warn!(code = %offered_code, "Concurrent redemption won by another device");
                return Err(PairingError::AlreadyUsed(offered_code.to_string()).into());
            }
            Err(e) if e.is_unique_violation_on("fingerprint") => {
                return self
                    .fail_fingerprint_conflict(offered_code, fingerprint, "<concurrent>", now)
                    .await;
            }
            Err(e) => return Err(e.into()),
        }

        let bound = self
            .codes
            .get_by_code(offered_code)
            .await?
            .ok_or_else(|| PairingError::code_not_found(offered_code))?;

        info!(
            code = %offered_code,
            device_ref = ?bound.device_ref,
            "Device paired"
        );
        Ok(bound)
    }

    /// Read-only code lookup, e.g. for an operator checking how many
    /// attempts remain.
    pub async fn status(&self, offered_code: &str) -> AuthResult<ActivationCode> {
        validation::validate_code_shape(offered_code)?;

        let record = self
            .codes
            .get_by_code(offered_code)
            .await?
            .ok_or_else(|| PairingError::code_not_found(offered_code))?;

        Ok(record)
    }

    /// Expires every `UNUSED`/`BOUND` code of a device (factory reset).
    ///
    /// Idempotent: re-invoking on an already-expired set returns 0. The
    /// caller pairs this with `SessionService::revoke_all` for the device's
    /// principal.
    pub async fn invalidate_device_codes(&self, device_ref: &str) -> AuthResult<u64> {
        validation::validate_opaque_ref("device_ref", device_ref)?;

        let now = Utc::now();
        let count = self.codes.expire_all_for_device(device_ref, now).await?;

        info!(device_ref = %device_ref, count = count, "Invalidated device activation codes");
        Ok(count)
    }

    /// True when the device holds a live (unused, unexpired) code.
    pub async fn has_active_code(&self, device_ref: &str) -> AuthResult<bool> {
        validation::validate_opaque_ref("device_ref", device_ref)?;

        let now = Utc::now();
        Ok(self.codes.count_live_for_device(device_ref, now).await? > 0)
    }

    /// Finds the code currently bound to a fingerprint.
    ///
    /// Device-reconnect path: a paired device re-presents its fingerprint
    /// to recover the binding without burning a new code.
    pub async fn find_binding(&self, fingerprint: &str) -> AuthResult<Option<ActivationCode>> {
        validation::validate_fingerprint(fingerprint)?;
        Ok(self.codes.find_bound_by_fingerprint(fingerprint).await?)
    }

    /// Shared tail of both fingerprint-conflict paths: count the failed
    /// attempt (committed regardless of the enclosing failure), then report.
    async fn fail_fingerprint_conflict(
        &self,
        offered_code: &str,
        fingerprint: &str,
        holder_code: &str,
        now: chrono::DateTime<Utc>,
    ) -> AuthResult<ActivationCode> {
        self.codes.increment_attempts(offered_code, now).await?;

        warn!(
            code = %offered_code,
            holder = %holder_code,
            "Fingerprint already bound to another activation code"
        );
        Err(PairingError::FingerprintConflict(fingerprint.to_string()).into())
    }
}
