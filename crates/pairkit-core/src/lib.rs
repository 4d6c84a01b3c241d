//! # pairkit-core: Pure Domain Logic for Pairkit
//!
//! This crate is the heart of the pairing core. It contains the activation
//! code state machine, code generation, and session types as pure logic with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Pairkit Architecture                          │
//! │                                                                     │
//! │  ┌────────────────────────────────────────────────────────────┐    │
//! │  │                 Collaborators (out of scope)               │    │
//! │  │   HTTP/gRPC adapter ── identity resolution ── login check  │    │
//! │  └────────────────────────────┬───────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼───────────────────────────────┐    │
//! │  │                     pairkit-auth                           │    │
//! │  │   PairingService · TokenIssuer · SessionService · Sweeper  │    │
//! │  └────────────────────────────┬───────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼───────────────────────────────┐    │
//! │  │              ★ pairkit-core (THIS CRATE) ★                 │    │
//! │  │                                                            │    │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  │    │
//! │  │   │  types   │  │   code   │  │  error   │  │validation│  │    │
//! │  │   │ Activa-  │  │ alphabet │  │ Pairing  │  │  input   │  │    │
//! │  │   │ tionCode │  │ generate │  │  Error   │  │  checks  │  │    │
//! │  │   │ Session  │  │          │  │          │  │          │  │    │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘  │    │
//! │  │                                                            │    │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS         │    │
//! │  └────────────────────────────┬───────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼───────────────────────────────┐    │
//! │  │                pairkit-db (Database Layer)                 │    │
//! │  │          SQLite queries, migrations, repositories          │    │
//! │  └────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records and lifecycle enums (ActivationCode, Session)
//! - [`code`] - Activation code alphabet and generation
//! - [`error`] - The closed domain error taxonomy
//! - [`validation`] - Input shape checks
//!
//! ## Design Principles
//!
//! 1. **No hidden clock**: `now` is always a parameter. Expiry decisions are
//!    deterministic functions of (record, now).
//! 2. **No hidden randomness**: the RNG is injected by the caller and must be
//!    cryptographically strong (enforced by a `CryptoRng` bound).
//! 3. **Explicit errors**: every expected failure is a typed variant, never a
//!    string or a panic.

pub mod code;
pub mod error;
pub mod types;
pub mod validation;

// Re-exports for convenience: `use pairkit_core::ActivationCode` instead of
// `use pairkit_core::types::ActivationCode`.
pub use error::{PairingError, PairingResult};
pub use types::{ActivationCode, CodeStatus, Session, SessionStatus, TokenKind};

/// Length of every activation code.
pub const CODE_LENGTH: usize = 12;

/// Default cap on failed redemption attempts before a code is burned.
pub const DEFAULT_MAX_ATTEMPTS: i64 = 3;

/// Default activation code lifetime: 24 hours.
pub const DEFAULT_CODE_TTL_SECS: i64 = 24 * 60 * 60;
