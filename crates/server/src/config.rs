//! Server configuration from the environment.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret the identity service signs session tokens with.
    pub session_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "PORT",
                value: raw,
            })?,
            Err(_) => 3000,
        };
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://wayfarer.db".to_string());
        let session_secret = std::env::var("SESSION_SECRET")
            .map_err(|_| ConfigError::MissingVar("SESSION_SECRET"))?;

        Ok(Self {
            host,
            port,
            database_url,
            session_secret,
        })
    }
}
