//! Outbound mail port.
//!
//! The platform only ever sends one kind of mail, the login code, so the
//! port is a single method. Production deployments plug in a real
//! transport; development and tests use [`ConsoleMailer`], which logs the
//! code instead of sending it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::Result;

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a one-time login code to `to`.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` when delivery fails.
    async fn send_login_code(&self, to: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()>;
}

/// Logs login codes instead of sending them.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a new console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send_login_code(&self, to: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let expires_minutes = (expires_at - Utc::now()).num_minutes();
        tracing::info!(
            to = %to,
            code = %code,
            expires_in_minutes = %expires_minutes,
            "Login code email (development mode)"
        );
        Ok(())
    }
}
