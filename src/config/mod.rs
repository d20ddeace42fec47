use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_TOKEN_TTL_SECS: u64 = 86400;

pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/sharetrip".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "sharetrip-dev-secret".to_string()),
            token_ttl_secs: env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because the process environment is shared across
    // test threads
    #[test]
    fn test_env_parsing() {
        std::env::remove_var("BIND_ADDR");
        std::env::remove_var("DATABASE_MAX_CONNECTIONS");
        std::env::remove_var("TOKEN_TTL_SECS");
        let config = Config::from_env();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);

        // Garbage numeric values fall back to the defaults
        std::env::set_var("DATABASE_MAX_CONNECTIONS", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.max_connections, 5);
        std::env::remove_var("DATABASE_MAX_CONNECTIONS");
    }
}
