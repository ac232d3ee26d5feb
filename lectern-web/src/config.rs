//! Configuration management for the Lectern server.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// `PostgreSQL` configuration; absent means the in-memory store
    pub database: DatabaseConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; when unset the server runs on the in-memory store
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session TTL in seconds (default: 7 days)
    pub session_ttl: u64,
    /// Login code TTL in seconds (default: 15 minutes)
    pub login_code_ttl: u64,
    /// **TESTING ONLY**: include login codes in API responses so automated
    /// tests can complete the auth flow without an inbox.
    ///
    /// # Security Warning
    ///
    /// This MUST be `false` in production: it hands the login code to any
    /// caller who knows an email address. Default: `false`.
    pub expose_login_codes: bool,
    /// Seed a platform administrator with this email on startup, if no
    /// account with it exists yet
    pub bootstrap_admin_email: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            auth: AuthConfig {
                session_ttl: env::var("AUTH_SESSION_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(604_800), // 7 days
                login_code_ttl: env::var("AUTH_LOGIN_CODE_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900), // 15 minutes
                expose_login_codes: env::var("AUTH_EXPOSE_LOGIN_CODES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                bootstrap_admin_email: env::var("AUTH_BOOTSTRAP_ADMIN_EMAIL").ok(),
            },
        }
    }
}
