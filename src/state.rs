use sqlx::PgPool;

use crate::config::Config;
use crate::ledger::BookingLedger;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl_secs: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ledger: BookingLedger,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            ledger: BookingLedger::new(pool.clone()),
            pool,
            auth: AuthConfig {
                secret: config.jwt_secret.clone(),
                token_ttl_secs: config.token_ttl_secs,
            },
        }
    }
}
