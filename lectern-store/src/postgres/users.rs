//! PostgreSQL user store.

use super::{db_err, unique_conflict, PgStore};
use crate::traits::{UserFilter, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{DomainError, Page, Paginated, Result, Role, SchoolId, User, UserId};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) role: String,
    pub(crate) school_id: Option<Uuid>,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn into_user(self) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            email: self.email,
            name: self.name,
            role: self.role.parse::<Role>().map_err(|_| {
                DomainError::unexpected(format!("Invalid role in database: {}", self.role))
            })?,
            school_id: self.school_id.map(SchoolId::from_uuid),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, role, school_id, active, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name, role, school_id, active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.school_id.map(|s| *s.as_uuid()))
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_conflict(e, "Email already registered"))?;
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<User> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        row.ok_or(DomainError::not_found("User"))?.into_user()
    }

    async fn user_by_email(&self, email: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;
        row.ok_or(DomainError::not_found("User"))?.into_user()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users
             SET email = $2, name = $3, role = $4, school_id = $5, active = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.school_id.map(|s| *s.as_uuid()))
        .bind(user.active)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_conflict(e, "Email already registered"))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User"));
        }
        Ok(())
    }

    async fn list_users(&self, filter: UserFilter, page: Page) -> Result<Paginated<User>> {
        let role = filter.role.map(Role::as_str);
        let school = filter.school.map(|s| *s.as_uuid());

        let conditions = "($1::text IS NULL OR role = $1)
               AND ($2::uuid IS NULL OR school_id = $2)
               AND (NOT $3 OR active)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM users WHERE {conditions}"
        ))
        .bind(role)
        .bind(school)
        .bind(filter.active_only)
        .fetch_one(self.pool())
        .await
        .map_err(db_err)?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE {conditions}
             ORDER BY created_at DESC, id
             LIMIT $4 OFFSET $5"
        ))
        .bind(role)
        .bind(school)
        .bind(filter.active_only)
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let users = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(users, u64::try_from(total).unwrap_or(0), page))
    }
}
