//! # Service Error Type
//!
//! Two layers, nothing more: expected pairing outcomes and storage
//! failures.
//!
//! Every variant of [`PairingError`] is a normal, typed result the adapter
//! maps to a client-facing status. [`DbError`] is the unrecoverable layer:
//! logged with context where it happens, surfaced as a generic failure.
//! The one anticipated storage signal, a unique-constraint hit on the
//! bound-fingerprint index, is intercepted inside the services and turned
//! into [`PairingError::FingerprintConflict`] before it can reach callers
//! as a storage failure.

use thiserror::Error;

use pairkit_core::PairingError;
use pairkit_db::DbError;

/// Errors returned by the pairing, session and sweeper services.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Expected, typed outcome (see [`PairingError`]).
    #[error(transparent)]
    Pairing(#[from] PairingError),

    /// Storage-layer failure the state machine did not anticipate.
    #[error("storage failure: {0}")]
    Storage(#[from] DbError),

    /// Failure inside this crate that no caller can act on (signing broke,
    /// the code space ran dry). Logged where it happens.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The expected-outcome variant, if this is one.
    pub fn as_pairing(&self) -> Option<&PairingError> {
        match self {
            AuthError::Pairing(e) => Some(e),
            AuthError::Storage(_) | AuthError::Internal(_) => None,
        }
    }
}

/// Result type for service operations.
pub type AuthResult<T> = Result<T, AuthError>;
