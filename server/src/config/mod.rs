use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::RetryPolicy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/eventdesk";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_JWT_ISSUER: &str = "eventdesk-identity";
const DEV_JWT_SECRET: &str = "eventdesk-development-secret";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub store_backend: StoreBackend,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub retry: RetryPolicy,
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

pub fn is_production() -> bool {
    env::var("RUST_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if is_production() => return Err(ConfigError::Missing("JWT_SECRET")),
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            parsed("TX_MAX_ATTEMPTS", defaults.max_attempts)?,
            Duration::from_millis(parsed(
                "TX_RETRY_BACKOFF_MS",
                defaults.backoff.as_millis() as u64,
            )?),
        );

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            store_backend: parsed("STORE_BACKEND", StoreBackend::Postgres)?,
            bind_addr: parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))?,
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string()),
            retry,
        })
    }
}
