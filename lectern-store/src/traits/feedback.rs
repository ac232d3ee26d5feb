//! Feedback store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{EventId, Feedback, FeedbackId, Page, Paginated, Result, UserId};
use serde::Serialize;

/// Rollup statistics for one event's feedback.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    /// Mean rating rounded to one decimal; 0.0 with no ratings
    pub average_rating: f64,
    /// Number of ratings
    pub total_ratings: u32,
    /// Count of ratings per star, index 0 holding one-star counts
    pub distribution: [u32; 5],
}

/// Database operations for feedback.
///
/// Every mutation recomputes the owning event's `average_rating` and
/// `total_ratings` inside the same operation, so the rollup never drifts
/// from the records.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Create feedback for an event. One record per (event, user).
    ///
    /// # Errors
    ///
    /// - `NotFound` when the event does not resolve
    /// - `Validation` when the rating is out of range
    /// - `Conflict` when the user already reviewed this event
    async fn submit_feedback(
        &self,
        id: FeedbackId,
        event_id: EventId,
        user: UserId,
        rating: u8,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Feedback>;

    /// Get feedback by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn feedback(&self, id: FeedbackId) -> Result<Feedback>;

    /// Update a feedback record's rating and/or comment.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the id does not resolve
    /// - `Ownership` unless the principal authored it or is a platform
    ///   administrator
    /// - `Validation` when the new rating is out of range
    async fn update_feedback(
        &self,
        id: FeedbackId,
        principal: UserId,
        is_super_admin: bool,
        rating: Option<u8>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Feedback>;

    /// Delete a feedback record.
    ///
    /// # Errors
    ///
    /// `NotFound` / `Ownership` as for updates.
    async fn delete_feedback(
        &self,
        id: FeedbackId,
        principal: UserId,
        is_super_admin: bool,
    ) -> Result<()>;

    /// List an event's feedback, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not resolve.
    async fn list_for_event(&self, event_id: EventId, page: Page) -> Result<Paginated<Feedback>>;

    /// List a user's own feedback, newest first.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn list_for_user(&self, user: UserId, page: Page) -> Result<Paginated<Feedback>>;

    /// Rollup statistics for an event.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not resolve.
    async fn stats_for_event(&self, event_id: EventId) -> Result<FeedbackStats>;
}
