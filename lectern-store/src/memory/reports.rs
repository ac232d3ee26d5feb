//! In-memory reporting queries.

use super::MemoryStore;
use crate::traits::{PlatformStats, ReportStore, SchoolEventCount, StatusBreakdown};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{EventRequestStatus, Result, SpeakerRequestStatus};
use std::collections::HashMap;

fn breakdown<I: Iterator<Item = &'static str>>(statuses: I) -> Vec<StatusBreakdown> {
    let mut counts: HashMap<&'static str, u64> = HashMap::new();
    for status in statuses {
        *counts.entry(status).or_default() += 1;
    }
    let mut rows: Vec<StatusBreakdown> = counts
        .into_iter()
        .map(|(status, count)| StatusBreakdown {
            status: status.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| a.status.cmp(&b.status));
    rows
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn platform_stats(&self, now: DateTime<Utc>) -> Result<PlatformStats> {
        let state = self.read();
        Ok(PlatformStats {
            total_schools: state.schools.len() as u64,
            total_users: state.users.values().filter(|u| u.active).count() as u64,
            total_events: state.events.len() as u64,
            upcoming_events: state.events.values().filter(|e| e.date > now).count() as u64,
            pending_event_requests: state
                .event_requests
                .values()
                .filter(|r| r.status == EventRequestStatus::Pending)
                .count() as u64,
            pending_speaker_requests: state
                .speaker_requests
                .values()
                .filter(|r| r.status == SpeakerRequestStatus::Pending)
                .count() as u64,
        })
    }

    async fn event_request_breakdown(&self) -> Result<Vec<StatusBreakdown>> {
        let state = self.read();
        Ok(breakdown(
            state.event_requests.values().map(|r| r.status.as_str()),
        ))
    }

    async fn speaker_request_breakdown(&self) -> Result<Vec<StatusBreakdown>> {
        let state = self.read();
        Ok(breakdown(
            state.speaker_requests.values().map(|r| r.status.as_str()),
        ))
    }

    async fn top_schools(&self, limit: u32) -> Result<Vec<SchoolEventCount>> {
        let state = self.read();
        let mut rows: Vec<SchoolEventCount> = state
            .schools
            .values()
            .map(|school| SchoolEventCount {
                school_id: school.id,
                name: school.name.clone(),
                event_count: state
                    .events
                    .values()
                    .filter(|e| e.host_school == school.id)
                    .count() as u64,
            })
            .collect();
        rows.sort_by(|a, b| b.event_count.cmp(&a.event_count).then(a.name.cmp(&b.name)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
