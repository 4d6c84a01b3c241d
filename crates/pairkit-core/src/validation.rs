//! # Input Validation
//!
//! Shape checks for caller-supplied identifiers, run before any storage
//! access. Everything here returns [`PairingError::InvalidArgument`]; the
//! deeper lifecycle verdicts (expired, already used, conflicting) belong to
//! the state machine in [`crate::types`].

use crate::code;
use crate::error::{PairingError, PairingResult};

/// Maximum stored length for fingerprints and opaque references.
pub const MAX_OPAQUE_LEN: usize = 255;

/// Validates a device fingerprint offered at redemption.
pub fn validate_fingerprint(fingerprint: &str) -> PairingResult<()> {
    if fingerprint.trim().is_empty() {
        return Err(PairingError::invalid_argument(
            "fingerprint",
            "must not be empty",
        ));
    }
    if fingerprint.len() > MAX_OPAQUE_LEN {
        return Err(PairingError::invalid_argument(
            "fingerprint",
            format!("must be at most {MAX_OPAQUE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Validates an opaque reference (`device_ref`, `principal_id`, ...).
///
/// The core never interprets these; it only refuses blank or oversized ones.
pub fn validate_opaque_ref(field: &'static str, value: &str) -> PairingResult<()> {
    if value.trim().is_empty() {
        return Err(PairingError::invalid_argument(field, "must not be empty"));
    }
    if value.len() > MAX_OPAQUE_LEN {
        return Err(PairingError::invalid_argument(
            field,
            format!("must be at most {MAX_OPAQUE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Validates the shape of a caller-supplied activation code.
pub fn validate_code_shape(value: &str) -> PairingResult<()> {
    if !code::is_well_formed(value) {
        return Err(PairingError::invalid_argument(
            "code",
            "must be 12 uppercase-alphanumeric characters",
        ));
    }
    Ok(())
}
