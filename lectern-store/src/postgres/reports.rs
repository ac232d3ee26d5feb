//! PostgreSQL reporting queries.

use super::{db_err, PgStore};
use crate::traits::{PlatformStats, ReportStore, SchoolEventCount, StatusBreakdown};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{Result, SchoolId};
use sqlx::PgExecutor;
use uuid::Uuid;

async fn count<'e, E: PgExecutor<'e>>(executor: E, sql: &str) -> Result<u64> {
    let n: i64 = sqlx::query_scalar(sql)
        .fetch_one(executor)
        .await
        .map_err(db_err)?;
    Ok(u64::try_from(n).unwrap_or(0))
}

async fn breakdown(pool: &sqlx::PgPool, table: &str) -> Result<Vec<StatusBreakdown>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
        "SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status"
    ))
    .fetch_all(pool)
    .await
    .map_err(db_err)?;
    Ok(rows
        .into_iter()
        .map(|(status, n)| StatusBreakdown {
            status,
            count: u64::try_from(n).unwrap_or(0),
        })
        .collect())
}

#[async_trait]
impl ReportStore for PgStore {
    async fn platform_stats(&self, now: DateTime<Utc>) -> Result<PlatformStats> {
        let upcoming: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE date > $1")
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;

        Ok(PlatformStats {
            total_schools: count(self.pool(), "SELECT COUNT(*) FROM schools").await?,
            total_users: count(self.pool(), "SELECT COUNT(*) FROM users WHERE active").await?,
            total_events: count(self.pool(), "SELECT COUNT(*) FROM events").await?,
            upcoming_events: u64::try_from(upcoming).unwrap_or(0),
            pending_event_requests: count(
                self.pool(),
                "SELECT COUNT(*) FROM event_requests WHERE status = 'pending'",
            )
            .await?,
            pending_speaker_requests: count(
                self.pool(),
                "SELECT COUNT(*) FROM speaker_requests WHERE status = 'pending'",
            )
            .await?,
        })
    }

    async fn event_request_breakdown(&self) -> Result<Vec<StatusBreakdown>> {
        breakdown(self.pool(), "event_requests").await
    }

    async fn speaker_request_breakdown(&self) -> Result<Vec<StatusBreakdown>> {
        breakdown(self.pool(), "speaker_requests").await
    }

    async fn top_schools(&self, limit: u32) -> Result<Vec<SchoolEventCount>> {
        let rows: Vec<(Uuid, String, i64)> = sqlx::query_as(
            "SELECT s.id, s.name, COUNT(e.id) AS event_count
             FROM schools s
             LEFT JOIN events e ON e.host_school = s.id
             GROUP BY s.id, s.name
             ORDER BY event_count DESC, s.name
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(id, name, n)| SchoolEventCount {
                school_id: SchoolId::from_uuid(id),
                name,
                event_count: u64::try_from(n).unwrap_or(0),
            })
            .collect())
    }
}
