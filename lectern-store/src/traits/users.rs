//! User store trait.

use async_trait::async_trait;
use lectern_core::{Page, Paginated, Result, Role, SchoolId, User, UserId};

/// Filters for user listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserFilter {
    /// Restrict to one role
    pub role: Option<Role>,
    /// Restrict to members of one school
    pub school: Option<SchoolId>,
    /// Drop deactivated accounts
    pub active_only: bool,
}

/// Database operations for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    ///
    /// `Conflict` when the email is already registered.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn user(&self, id: UserId) -> Result<User>;

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// `NotFound` when no account has this email.
    async fn user_by_email(&self, email: &str) -> Result<User>;

    /// Overwrite a user record.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve, `Conflict` when the new
    /// email collides with another account.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn list_users(&self, filter: UserFilter, page: Page) -> Result<Paginated<User>>;
}
