//! PostgreSQL feedback store.
//!
//! Every mutation recomputes the owning event's rollup inside the same
//! transaction, so `events.average_rating`/`total_ratings` always equal
//! the mean and count of the rows in `feedback`.

use super::{db_err, unique_conflict, PgStore};
use crate::traits::{FeedbackStats, FeedbackStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::feedback::{rating_rollup, validate_rating};
use lectern_core::{DomainError, EventId, Feedback, FeedbackId, Page, Paginated, Result, UserId};
use sqlx::{FromRow, PgExecutor, Postgres, Transaction};
use uuid::Uuid;

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FeedbackRow {
    fn into_feedback(self) -> Result<Feedback> {
        Ok(Feedback {
            id: FeedbackId::from_uuid(self.id),
            event_id: EventId::from_uuid(self.event_id),
            user_id: UserId::from_uuid(self.user_id),
            rating: u8::try_from(self.rating).map_err(|_| {
                DomainError::unexpected(format!("Invalid rating in database: {}", self.rating))
            })?,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const FEEDBACK_COLUMNS: &str = "id, event_id, user_id, rating, comment, created_at, updated_at";

async fn event_exists<'e, E: PgExecutor<'e>>(executor: E, event: Uuid) -> Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
        .bind(event)
        .fetch_one(executor)
        .await
        .map_err(db_err)
}

async fn ratings_for<'e, E: PgExecutor<'e>>(executor: E, event: Uuid) -> Result<Vec<u8>> {
    let rows: Vec<(i16,)> = sqlx::query_as("SELECT rating FROM feedback WHERE event_id = $1")
        .bind(event)
        .fetch_all(executor)
        .await
        .map_err(db_err)?;
    Ok(rows
        .into_iter()
        .map(|(r,)| u8::try_from(r).unwrap_or(0))
        .collect())
}

async fn refresh_rollup(
    tx: &mut Transaction<'_, Postgres>,
    event: Uuid,
    now: DateTime<Utc>,
) -> Result<()> {
    let ratings = ratings_for(&mut **tx, event).await?;
    let (average, total) = rating_rollup(&ratings);
    sqlx::query(
        "UPDATE events SET average_rating = $2, total_ratings = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(event)
    .bind(average)
    .bind(i32::try_from(total).unwrap_or(i32::MAX))
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn submit_feedback(
        &self,
        id: FeedbackId,
        event_id: EventId,
        user: UserId,
        rating: u8,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Feedback> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        if !event_exists(&mut *tx, *event_id.as_uuid()).await? {
            return Err(DomainError::not_found("Event"));
        }
        let feedback = Feedback::new(id, event_id, user, rating, comment, now)?;

        sqlx::query(
            "INSERT INTO feedback (id, event_id, user_id, rating, comment, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(feedback.id.as_uuid())
        .bind(feedback.event_id.as_uuid())
        .bind(feedback.user_id.as_uuid())
        .bind(i16::from(feedback.rating))
        .bind(&feedback.comment)
        .bind(feedback.created_at)
        .bind(feedback.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, "You have already reviewed this event"))?;

        refresh_rollup(&mut tx, *event_id.as_uuid(), now).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(feedback)
    }

    async fn feedback(&self, id: FeedbackId) -> Result<Feedback> {
        let row: Option<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;
        row.ok_or(DomainError::not_found("Feedback"))?.into_feedback()
    }

    async fn update_feedback(
        &self,
        id: FeedbackId,
        principal: UserId,
        is_super_admin: bool,
        rating: Option<u8>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Feedback> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let row: Option<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let mut feedback = row.ok_or(DomainError::not_found("Feedback"))?.into_feedback()?;
        feedback.authorize_mutate(principal, is_super_admin)?;

        if let Some(rating) = rating {
            validate_rating(rating)?;
            feedback.rating = rating;
        }
        if let Some(comment) = comment {
            feedback.comment = Some(comment);
        }
        feedback.updated_at = now;

        sqlx::query("UPDATE feedback SET rating = $2, comment = $3, updated_at = $4 WHERE id = $1")
            .bind(feedback.id.as_uuid())
            .bind(i16::from(feedback.rating))
            .bind(&feedback.comment)
            .bind(feedback.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        refresh_rollup(&mut tx, *feedback.event_id.as_uuid(), now).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(feedback)
    }

    async fn delete_feedback(
        &self,
        id: FeedbackId,
        principal: UserId,
        is_super_admin: bool,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let row: Option<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let feedback = row.ok_or(DomainError::not_found("Feedback"))?.into_feedback()?;
        feedback.authorize_mutate(principal, is_super_admin)?;

        sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        refresh_rollup(&mut tx, *feedback.event_id.as_uuid(), Utc::now()).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_for_event(&self, event_id: EventId, page: Page) -> Result<Paginated<Feedback>> {
        if !event_exists(self.pool(), *event_id.as_uuid()).await? {
            return Err(DomainError::not_found("Event"));
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE event_id = $1")
            .bind(event_id.as_uuid())
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;

        let rows: Vec<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback
             WHERE event_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        ))
        .bind(event_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let feedback = rows
            .into_iter()
            .map(FeedbackRow::into_feedback)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(feedback, u64::try_from(total).unwrap_or(0), page))
    }

    async fn list_for_user(&self, user: UserId, page: Page) -> Result<Paginated<Feedback>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE user_id = $1")
            .bind(user.as_uuid())
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;

        let rows: Vec<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback
             WHERE user_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        ))
        .bind(user.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let feedback = rows
            .into_iter()
            .map(FeedbackRow::into_feedback)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(feedback, u64::try_from(total).unwrap_or(0), page))
    }

    async fn stats_for_event(&self, event_id: EventId) -> Result<FeedbackStats> {
        if !event_exists(self.pool(), *event_id.as_uuid()).await? {
            return Err(DomainError::not_found("Event"));
        }
        let ratings = ratings_for(self.pool(), *event_id.as_uuid()).await?;
        let (average_rating, total_ratings) = rating_rollup(&ratings);
        let mut distribution = [0u32; 5];
        for rating in ratings {
            if (1..=5).contains(&rating) {
                distribution[usize::from(rating) - 1] += 1;
            }
        }
        Ok(FeedbackStats {
            average_rating,
            total_ratings,
            distribution,
        })
    }
}
