//! Reporting queries for the administrator dashboard.
//!
//! Pure read-only rollups recomputed on every call; nothing here mutates
//! state or is cached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{Result, SchoolId};
use serde::Serialize;

/// Platform-wide headline counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    /// Registered schools
    pub total_schools: u64,
    /// Active user accounts
    pub total_users: u64,
    /// Materialized events
    pub total_events: u64,
    /// Events dated in the future
    pub upcoming_events: u64,
    /// Event proposals awaiting review
    pub pending_event_requests: u64,
    /// Speaker applications awaiting review
    pub pending_speaker_requests: u64,
}

/// One row of a group-by-status breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    /// The status value
    pub status: String,
    /// Number of records in it
    pub count: u64,
}

/// One row of the schools-by-event-count ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolEventCount {
    /// The school
    pub school_id: SchoolId,
    /// Its name
    pub name: String,
    /// Events it hosts
    pub event_count: u64,
}

/// Read-only dashboard rollups.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Headline counts for the dashboard.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn platform_stats(&self, now: DateTime<Utc>) -> Result<PlatformStats>;

    /// Event proposals grouped by status.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn event_request_breakdown(&self) -> Result<Vec<StatusBreakdown>>;

    /// Speaker applications grouped by status.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn speaker_request_breakdown(&self) -> Result<Vec<StatusBreakdown>>;

    /// Schools ranked by hosted event count, descending.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn top_schools(&self, limit: u32) -> Result<Vec<SchoolEventCount>>;
}
