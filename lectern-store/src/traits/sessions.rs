//! Session store trait.
//!
//! Authentication is passwordless: a login code is issued to the account's
//! email and exchanged for an opaque bearer token, which is validated
//! against this store on every request. No other session state is kept.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{Result, UserId};

/// An issued bearer session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// The opaque bearer token
    pub token: String,
    /// The authenticated account
    pub user_id: UserId,
    /// When the session was issued
    pub created_at: DateTime<Utc>,
    /// When the session stops validating
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A one-time login code awaiting redemption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginCode {
    /// The one-time code
    pub code: String,
    /// Email the code was issued to
    pub email: String,
    /// When the code stops redeeming
    pub expires_at: DateTime<Utc>,
}

/// Database operations for sessions and login codes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a freshly issued login code.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn create_login_code(&self, code: &LoginCode) -> Result<()>;

    /// Redeem a login code: returns the email it was issued to, or `None`
    /// when the code is unknown, expired, or already redeemed. Redemption
    /// is one-time.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn consume_login_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<String>>;

    /// Store a freshly issued session.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Look up a session by token. Returns `None` when the token is
    /// unknown or expired.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>>;

    /// Revoke a session. Revoking an unknown token is not an error.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn delete_session(&self, token: &str) -> Result<()>;
}
