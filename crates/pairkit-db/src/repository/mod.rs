//! # Repository Module
//!
//! Database repository implementations for the pairing core.
//!
//! One repository per table, and each table has exactly one owner:
//! [`ActivationCodeRepository`] is the only writer of `activation_codes`,
//! [`SessionRepository`] the only writer of `sessions`. Services compose
//! these; they never issue SQL themselves.
//!
//! ## Available Repositories
//!
//! - [`ActivationCodeRepository`] - Activation code lifecycle rows
//! - [`SessionRepository`] - Session rows and token lookups
//!
//! [`ActivationCodeRepository`]: activation_code::ActivationCodeRepository
//! [`SessionRepository`]: session::SessionRepository

pub mod activation_code;
pub mod session;
