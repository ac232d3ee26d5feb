//! PostgreSQL school store.

use super::users::UserRow;
use super::{db_err, unique_conflict, PgStore};
use crate::traits::SchoolStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{DomainError, Page, Paginated, Result, School, SchoolId, User, UserId};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(FromRow)]
struct SchoolRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    admin_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SchoolRow {
    fn into_school(self, additional_admins: Vec<UserId>) -> School {
        School {
            id: SchoolId::from_uuid(self.id),
            name: self.name,
            description: self.description,
            admin: UserId::from_uuid(self.admin_id),
            additional_admins,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

async fn additional_admins<'e, E: PgExecutor<'e>>(
    executor: E,
    school: Uuid,
) -> Result<Vec<UserId>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM school_admins WHERE school_id = $1 ORDER BY user_id")
            .bind(school)
            .fetch_all(executor)
            .await
            .map_err(db_err)?;
    Ok(rows.into_iter().map(|(id,)| UserId::from_uuid(id)).collect())
}

const SCHOOL_COLUMNS: &str = "id, name, description, admin_id, created_at, updated_at";

#[async_trait]
impl SchoolStore for PgStore {
    async fn create_school(&self, school: &School) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        sqlx::query(
            "INSERT INTO schools (id, name, description, admin_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(school.id.as_uuid())
        .bind(&school.name)
        .bind(&school.description)
        .bind(school.admin.as_uuid())
        .bind(school.created_at)
        .bind(school.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, "A school with this name already exists"))?;

        for admin in &school.additional_admins {
            sqlx::query("INSERT INTO school_admins (school_id, user_id) VALUES ($1, $2)")
                .bind(school.id.as_uuid())
                .bind(admin.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn school(&self, id: SchoolId) -> Result<School> {
        let row: Option<SchoolRow> =
            sqlx::query_as(&format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(db_err)?;
        let row = row.ok_or(DomainError::not_found("School"))?;
        let admins = additional_admins(self.pool(), row.id).await?;
        Ok(row.into_school(admins))
    }

    async fn update_school(&self, school: &School) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let result = sqlx::query(
            "UPDATE schools
             SET name = $2, description = $3, admin_id = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(school.id.as_uuid())
        .bind(&school.name)
        .bind(&school.description)
        .bind(school.admin.as_uuid())
        .bind(school.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, "A school with this name already exists"))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("School"));
        }

        sqlx::query("DELETE FROM school_admins WHERE school_id = $1")
            .bind(school.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        for admin in &school.additional_admins {
            sqlx::query("INSERT INTO school_admins (school_id, user_id) VALUES ($1, $2)")
                .bind(school.id.as_uuid())
                .bind(admin.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_school(&self, id: SchoolId) -> Result<()> {
        let hosting: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE host_school = $1")
            .bind(id.as_uuid())
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;
        if hosting > 0 {
            return Err(DomainError::invalid_state(
                "Schools hosting events cannot be deleted",
            ));
        }
        let result = sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("School"));
        }
        Ok(())
    }

    async fn list_schools(&self, page: Page) -> Result<Paginated<School>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools")
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;

        let rows: Vec<SchoolRow> = sqlx::query_as(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let mut schools = Vec::with_capacity(rows.len());
        for row in rows {
            let admins = additional_admins(self.pool(), row.id).await?;
            schools.push(row.into_school(admins));
        }
        Ok(Paginated::new(schools, u64::try_from(total).unwrap_or(0), page))
    }

    async fn school_for_admin(&self, user: UserId) -> Result<Option<School>> {
        let row: Option<SchoolRow> = sqlx::query_as(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools s
             WHERE s.admin_id = $1
                OR EXISTS (
                    SELECT 1 FROM school_admins a
                    WHERE a.school_id = s.id AND a.user_id = $1
                )
             LIMIT 1"
        ))
        .bind(user.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => {
                let admins = additional_admins(self.pool(), row.id).await?;
                Ok(Some(row.into_school(admins)))
            }
            None => Ok(None),
        }
    }

    async fn school_students(&self, id: SchoolId, page: Page) -> Result<Paginated<User>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;
        if !exists {
            return Err(DomainError::not_found("School"));
        }

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE school_id = $1 AND role = 'student'",
        )
        .bind(id.as_uuid())
        .fetch_one(self.pool())
        .await
        .map_err(db_err)?;

        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, email, name, role, school_id, active, created_at, updated_at
             FROM users
             WHERE school_id = $1 AND role = 'student'
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3",
        )
        .bind(id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let students = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(students, u64::try_from(total).unwrap_or(0), page))
    }
}
