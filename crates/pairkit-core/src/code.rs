//! # Activation Code Generation
//!
//! Produces the short, human-enterable one-time codes that authorize device
//! pairing.
//!
//! The code is the sole secret protecting the pairing flow, so the random
//! source must be cryptographically strong: [`generate_code`] takes any RNG
//! but the `CryptoRng` marker bound makes a predictable generator a compile
//! error. Callers construct the RNG once at process start and inject it
//! (`rand::rngs::OsRng` in production).
//!
//! The generator is stateless and pure given the RNG. It does not check
//! uniqueness; on a (vanishingly rare) collision the durable store rejects
//! the insert and the issue flow re-draws.

use rand::{CryptoRng, Rng};

use crate::CODE_LENGTH;

/// The 36-symbol alphabet codes are drawn from. Uppercase-only so codes
/// survive being read over the phone or typed on a terminal keypad.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws a fresh 12-character activation code from the injected RNG.
///
/// ## Example
/// ```rust
/// use pairkit_core::code::{generate_code, is_well_formed};
///
/// let code = generate_code(&mut rand::rngs::OsRng);
/// assert!(is_well_formed(&code));
/// ```
pub fn generate_code<R: Rng + CryptoRng>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Checks that a caller-supplied string has the shape of an activation code.
///
/// Used to reject garbage input with `InvalidArgument` before any storage
/// lookup; a well-formed code can still be unknown or expired.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_well_formed() {
        let mut rng = rand::rngs::OsRng;
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generated_codes_vary() {
        // Not a randomness test; just catches a generator wired to a
        // constant.
        let mut rng = rand::rngs::OsRng;
        let a = generate_code(&mut rng);
        let b = generate_code(&mut rng);
        let c = generate_code(&mut rng);
        assert!(a != b || b != c);
    }

    #[test]
    fn test_well_formed_rejects_bad_shapes() {
        assert!(is_well_formed("AB12CD34EF56"));

        assert!(!is_well_formed(""));
        assert!(!is_well_formed("AB12CD34EF5")); // 11 chars
        assert!(!is_well_formed("AB12CD34EF567")); // 13 chars
        assert!(!is_well_formed("ab12cd34ef56")); // lowercase
        assert!(!is_well_formed("AB12CD34EF5!")); // symbol
    }
}
