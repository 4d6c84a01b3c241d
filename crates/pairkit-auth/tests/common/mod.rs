//! Shared test harness: an isolated in-memory database plus the three
//! services wired the way a process would wire them at startup.

use pairkit_auth::{AuthConfig, PairingService, SessionService, Sweeper, TokenIssuer};
use pairkit_db::{Database, DbConfig};

pub struct TestCore {
    pub pairing: PairingService,
    pub sessions: SessionService,
    pub sweeper: Sweeper,
    pub config: AuthConfig,
}

pub async fn setup() -> TestCore {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();

    setup_with(AuthConfig::for_tests()).await
}

pub async fn setup_with(config: AuthConfig) -> TestCore {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let issuer = TokenIssuer::from_config(&config);

    TestCore {
        pairing: PairingService::new(&db, config.clone()),
        sessions: SessionService::new(&db, issuer),
        sweeper: Sweeper::new(&db),
        config,
    }
}
