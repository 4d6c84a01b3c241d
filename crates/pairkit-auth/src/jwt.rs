//! # Token Issuer
//!
//! Mints and verifies the signed, self-contained access/refresh tokens.
//! This is the only code path in the system that produces credentials.
//!
//! Tokens are HS256 JWTs. Claims embed the principal id (`sub`), the token
//! kind (`access` | `refresh`), issue and expiry instants, and a unique
//! `jti`, so a token is verifiable without any store lookup, and two tokens
//! minted in the same second are still distinct strings. The `jti` on
//! refresh tokens is the hook for server-side revocation lists; here the
//! session registry's own status field plays that role.
//!
//! Expiry is decided purely by comparing the embedded `exp` against the
//! caller's clock: library expiry validation is switched off, there is no
//! implicit leeway, and an expired-but-authentic token still verifies:
//! `expired` is a datum in the result, not a decode failure. That lets the
//! refresh flow accept a session whose access token has lapsed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use pairkit_core::{PairingError, TokenKind};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the principal the token was issued to.
    pub sub: String,

    /// Token kind: `access` or `refresh`.
    pub kind: TokenKind,

    /// Paired device the login came from, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_ref: Option<String>,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration (Unix timestamp).
    pub exp: i64,

    /// Unique identifier for this token.
    pub jti: String,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Verification outcome: everything a caller learns from a token alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// The principal the token was issued to.
    pub principal_id: String,

    /// Which flavor of token this is.
    pub kind: TokenKind,

    /// Whether the embedded expiry lies before the caller's clock. The
    /// signature verified either way.
    pub expired: bool,
}

/// Mints and verifies signed tokens.
///
/// Constructed once at process start from [`AuthConfig`] and injected into
/// the session service; the keys are never mutated afterwards.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Creates a new token issuer.
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Creates an issuer from loaded configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        TokenIssuer::new(
            &config.jwt_secret,
            config.access_ttl_secs,
            config.refresh_ttl_secs,
        )
    }

    /// Access token lifetime in seconds (the `expires_in` of grants).
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }

    /// Mints an access token for a principal.
    pub fn issue_access(
        &self,
        principal_id: &str,
        device_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        self.issue(principal_id, device_ref, TokenKind::Access, self.access_ttl, now)
    }

    /// Mints a refresh token for a principal.
    pub fn issue_refresh(
        &self,
        principal_id: &str,
        device_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        self.issue(principal_id, device_ref, TokenKind::Refresh, self.refresh_ttl, now)
    }

    /// Mints a matched access/refresh pair.
    pub fn issue_pair(
        &self,
        principal_id: &str,
        device_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(principal_id, device_ref, now)?,
            refresh_token: self.issue_refresh(principal_id, device_ref, now)?,
        })
    }

    fn issue(
        &self,
        principal_id: &str,
        device_ref: Option<&str>,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let claims = Claims {
            sub: principal_id.to_string(),
            kind,
            device_ref: device_ref.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verifies a token's signature and structure, and reads its claims.
    ///
    /// ## Returns
    /// * `Ok(TokenInfo)` - authentic token; check `expired` yourself
    /// * `Err(InvalidSignature)` - tampering or wrong key
    /// * `Err(Malformed)` - not a JWT, bad base64/JSON, missing claims
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenInfo> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is a datum, not a decode failure; compared by hand below
        // with zero leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::Pairing(PairingError::InvalidSignature)
                }
                _ => AuthError::Pairing(PairingError::Malformed(e.to_string())),
            }
        })?;

        Ok(TokenInfo {
            principal_id: data.claims.sub,
            kind: data.claims.kind,
            expired: now.timestamp() > data.claims.exp,
        })
    }
}
