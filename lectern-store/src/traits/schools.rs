//! School store trait.

use async_trait::async_trait;
use lectern_core::{Page, Paginated, Result, School, SchoolId, User, UserId};

/// Database operations for schools (tenants).
#[async_trait]
pub trait SchoolStore: Send + Sync {
    /// Create a school.
    ///
    /// # Errors
    ///
    /// `Conflict` when a school with this name already exists.
    async fn create_school(&self, school: &School) -> Result<()>;

    /// Get a school by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn school(&self, id: SchoolId) -> Result<School>;

    /// Overwrite a school record, including its admin lists.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve, `Conflict` on a name
    /// collision.
    async fn update_school(&self, school: &School) -> Result<()>;

    /// Delete a school.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve, `InvalidState` while the
    /// school still hosts events.
    async fn delete_school(&self, id: SchoolId) -> Result<()>;

    /// List schools, newest first.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn list_schools(&self, page: Page) -> Result<Paginated<School>>;

    /// The school this user administers (as primary or additional admin),
    /// if any.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn school_for_admin(&self, user: UserId) -> Result<Option<School>>;

    /// Students belonging to a school, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the school does not resolve.
    async fn school_students(&self, id: SchoolId, page: Page) -> Result<Paginated<User>>;
}
