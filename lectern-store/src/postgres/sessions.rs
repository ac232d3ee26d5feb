//! PostgreSQL session store.

use super::{db_err, PgStore};
use crate::traits::{LoginCode, Session, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{Result, UserId};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct SessionRow {
    token: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_login_code(&self, code: &LoginCode) -> Result<()> {
        sqlx::query("INSERT INTO login_codes (code, email, expires_at) VALUES ($1, $2, $3)")
            .bind(&code.code)
            .bind(&code.email)
            .bind(code.expires_at)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn consume_login_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        // Delete-returning makes redemption one-time even under
        // concurrent submissions of the same code.
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            "DELETE FROM login_codes WHERE code = $1 RETURNING email, expires_at",
        )
        .bind(code)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;
        Ok(row.and_then(|(email, expires_at)| (now < expires_at).then_some(email)))
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id.as_uuid())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(self.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT token, user_id, created_at, expires_at FROM sessions
             WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;
        Ok(row.map(|r| Session {
            token: r.token,
            user_id: UserId::from_uuid(r.user_id),
            created_at: r.created_at,
            expires_at: r.expires_at,
        }))
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
