use anyhow::{bail, Result};
use chrono::Duration;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Base64-encoded PEM keys.
    pub access_private_key: String,
    pub access_public_key: String,
    pub access_token_ttl: Duration,
    pub refresh_private_key: String,
    pub refresh_public_key: String,
    pub refresh_token_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub store_timeout: std::time::Duration,
    pub tokens: TokenConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => bail!("unknown STORE_BACKEND: {}", other),
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/dictionary".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            store_backend,
            store_timeout: std::time::Duration::from_millis(
                env::var("STORE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()?,
            ),
            tokens: TokenConfig {
                access_private_key: required("ACCESS_TOKEN_PRIVATE_KEY")?,
                access_public_key: required("ACCESS_TOKEN_PUBLIC_KEY")?,
                access_token_ttl: Duration::hours(
                    env::var("ACCESS_TOKEN_EXPIRY_HOUR")
                        .unwrap_or_else(|_| "1".to_string())
                        .parse()?,
                ),
                refresh_private_key: required("REFRESH_TOKEN_PRIVATE_KEY")?,
                refresh_public_key: required("REFRESH_TOKEN_PUBLIC_KEY")?,
                refresh_token_ttl: Duration::hours(
                    env::var("REFRESH_TOKEN_EXPIRY_HOUR")
                        .unwrap_or_else(|_| "168".to_string()) // 7 days
                        .parse()?,
                ),
            },
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{} is required", name),
    }
}
