//! # Error Types
//!
//! The closed domain error taxonomy for the pairing core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  pairkit-core errors (this file)                                    │
//! │  └── PairingError     - Every expected, typed outcome               │
//! │                                                                     │
//! │  pairkit-db errors (separate crate)                                 │
//! │  └── DbError          - Storage failures (unexpected)               │
//! │                                                                     │
//! │  pairkit-auth errors (service crate)                                │
//! │  └── AuthError        - Pairing(expected) | Storage(internal)       │
//! │                                                                     │
//! │  Flow: PairingError ─┐                                              │
//! │        DbError      ─┴─► AuthError ─► caller maps to status codes   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Every variant is an expected outcome returned to the caller; these
//!    are not control-flow exceptions and they never crash the process.
//! 2. Variants carry enough context (code, session id, field name) for the
//!    caller to act without inspecting internal state.
//! 3. The set is closed: collaborators match exhaustively.

use thiserror::Error;

/// Expected, typed outcomes of pairing and session operations.
#[derive(Debug, Error)]
pub enum PairingError {
    /// The referenced code or session does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Redemption offered against a code that is no longer `UNUSED`.
    ///
    /// Also returned to the loser of a concurrent redemption race: the
    /// conditional UNUSED→BOUND update admits exactly one winner.
    #[error("activation code {0} has already been used or invalidated")]
    AlreadyUsed(String),

    /// The record's time window has elapsed.
    ///
    /// For activation codes this also flips the record to `EXPIRED` as a
    /// side effect; for refresh tokens it is a pure read-time verdict.
    #[error("{0} has expired")]
    Expired(String),

    /// Failed redemption attempts reached `max_attempts`; the code is
    /// burned (`EXPIRED`) and never redeemable again.
    #[error("activation code {0} has exhausted its redemption attempts")]
    AttemptsExceeded(String),

    /// The offered fingerprint is already bound to a different live code.
    ///
    /// Counts as a failed redemption: `attempts` on the offered code is
    /// incremented before this is returned.
    #[error("device fingerprint {0} is already bound to another activation code")]
    FingerprintConflict(String),

    /// Malformed or missing input, rejected before touching storage.
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// Token signature does not verify against the issuer key.
    #[error("token signature verification failed")]
    InvalidSignature,

    /// Token is structurally broken (not a JWT, bad base64, missing claims).
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The session was explicitly revoked; terminal, never reactivated.
    #[error("session {0} has been revoked")]
    Revoked(String),
}

impl PairingError {
    /// Shorthand for an [`PairingError::InvalidArgument`].
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PairingError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// NotFound for an activation code.
    pub fn code_not_found(code: &str) -> Self {
        PairingError::NotFound(format!("activation code {code}"))
    }

    /// NotFound for a session.
    pub fn session_not_found(session_id: &str) -> Self {
        PairingError::NotFound(format!("session {session_id}"))
    }
}

/// Convenience type alias for results with PairingError.
pub type PairingResult<T> = Result<T, PairingError>;
