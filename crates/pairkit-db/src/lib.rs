//! # pairkit-db: SQLite Persistence for the Pairing Core
//!
//! Owns every durable row in the system: activation codes and sessions.
//! Nothing outside this crate writes SQL.
//!
//! ## Modules
//! - [`pool`] - Connection pool configuration and the [`Database`] handle
//! - [`migrations`] - Embedded schema migrations
//! - [`repository`] - Row ownership: one repository per table
//! - [`error`] - Storage error types
//!
//! ## Concurrency Contract
//! The one strict mutual-exclusion requirement in the whole system lives
//! here: the UNUSED→BOUND transition of an activation code is a single
//! conditional `UPDATE`, and the at-most-one-bound-code-per-fingerprint
//! guarantee is a partial unique index evaluated inside that same statement.
//! Two concurrent redemptions of one code, or of one fingerprint via two
//! codes, therefore cannot both succeed. Everything else is independent
//! per-row work on the pool.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// Re-exports
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::activation_code::ActivationCodeRepository;
pub use repository::session::SessionRepository;
