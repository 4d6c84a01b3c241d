//! # pairkit-auth: The Pairing Core's Service Surface
//!
//! Device pairing and session issuance for a point-of-sale fleet. An
//! operator (or the device itself) requests an activation code; the device
//! later redeems that code together with its hardware fingerprint; once
//! bound, the authenticated principal is granted an access/refresh token
//! session. An externally scheduled sweeper reclaims abandoned codes and
//! lapsed sessions.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  operator ──► PairingService::issue ──────────► code (UNUSED)       │
//! │                                                                     │
//! │  device  ───► PairingService::redeem ─────────► code (BOUND)        │
//! │                 {code, fingerprint}                 │               │
//! │                                                     ▼               │
//! │  caller  ───► SessionService::login ──────────► access + refresh    │
//! │                                                   tokens            │
//! │                                                                     │
//! │  cron    ───► Sweeper::sweep ─────────────────► stale rows EXPIRED  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`pairing`] - Activation code issuance, redemption, invalidation
//! - [`jwt`] - Signed token minting and verification
//! - [`session`] - Session registry: login, refresh, revocation
//! - [`sweeper`] - Batch expiry of stale codes and sessions
//! - [`config`] - Environment configuration, loaded once at process start
//! - [`error`] - Service error type

pub mod config;
pub mod error;
pub mod jwt;
pub mod pairing;
pub mod session;
pub mod sweeper;

// Re-exports
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthResult};
pub use jwt::{TokenInfo, TokenIssuer, TokenPair};
pub use pairing::PairingService;
pub use session::{LoginGrant, RefreshGrant, SessionService};
pub use sweeper::{SweepReport, Sweeper};
