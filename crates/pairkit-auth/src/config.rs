//! # Configuration
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults, once at process start. Services receive the loaded value by
//! reference or clone; nothing re-reads the environment later.

use serde::{Deserialize, Serialize};
use std::env;

use pairkit_core::{DEFAULT_CODE_TTL_SECS, DEFAULT_MAX_ATTEMPTS};

/// Pairing core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// SQLite database file path.
    pub database_path: String,

    /// Secret key for signing tokens (HS256).
    pub jwt_secret: String,

    /// Access token lifetime in seconds. Default: 1 hour.
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds. Default: 30 days.
    pub refresh_ttl_secs: i64,

    /// Activation code lifetime in seconds. Default: 24 hours.
    pub code_ttl_secs: i64,

    /// Failed redemption attempts before a code is burned. Default: 3.
    pub code_max_attempts: i64,

    /// When true, `issue` rejects requests that carry no device reference.
    pub require_device_ref: bool,
}

impl AuthConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = AuthConfig {
            database_path: env::var("PAIRKIT_DATABASE_PATH")
                .unwrap_or_else(|_| "./pairkit.db".to_string()),

            jwt_secret: env::var("PAIRKIT_JWT_SECRET").unwrap_or_else(|_| {
                // Development fallback; production MUST set the variable.
                "pairkit-dev-secret-change-in-production".to_string()
            }),

            access_ttl_secs: env::var("PAIRKIT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hour
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAIRKIT_ACCESS_TTL_SECS".to_string()))?,

            refresh_ttl_secs: env::var("PAIRKIT_REFRESH_TTL_SECS")
                .unwrap_or_else(|_| "2592000".to_string()) // 30 days
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAIRKIT_REFRESH_TTL_SECS".to_string()))?,

            code_ttl_secs: env::var("PAIRKIT_CODE_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_CODE_TTL_SECS.to_string()) // 24 hours
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAIRKIT_CODE_TTL_SECS".to_string()))?,

            code_max_attempts: env::var("PAIRKIT_CODE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| DEFAULT_MAX_ATTEMPTS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAIRKIT_CODE_MAX_ATTEMPTS".to_string()))?,

            require_device_ref: env::var("PAIRKIT_REQUIRE_DEVICE_REF")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Ready-made configuration for tests: short-lived, permissive.
    pub fn for_tests() -> Self {
        AuthConfig {
            database_path: ":memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 2_592_000,
            code_ttl_secs: DEFAULT_CODE_TTL_SECS,
            code_max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_device_ref: false,
        }
    }

    /// Cross-field checks that env parsing alone cannot express.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_ttl_secs <= 0 || self.refresh_ttl_secs <= 0 || self.code_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "ttl values must be positive".to_string(),
            ));
        }

        // Session invariant: the access window may never outlive the
        // refresh window.
        if self.access_ttl_secs > self.refresh_ttl_secs {
            return Err(ConfigError::AccessOutlivesRefresh);
        }

        if self.code_max_attempts < 1 {
            return Err(ConfigError::InvalidValue(
                "PAIRKIT_CODE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}")]
    InvalidValue(String),

    #[error("access token lifetime exceeds refresh token lifetime")]
    AccessOutlivesRefresh,
}
