//! Workflow store traits.
//!
//! These traits expose each workflow transition as one atomic operation:
//! the implementation loads the affected rows, runs the pure guards from
//! `lectern-core`, and persists the outcome in a single step. Nothing else
//! may mutate a request, so a transition can never observe a stale status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::workflow::event_request::{
    EventRequest, EventRequestStatus, Proposal, ProposalPatch, ReviewDecision,
};
use lectern_core::workflow::speaker_request::{
    Application, ApplicationPatch, SpeakerRequest, SpeakerRequestStatus, SpeakerReviewDecision,
};
use lectern_core::{
    Event, EventId, EventRequestId, Page, Paginated, Result, SchoolId, SpeakerRequestId, User,
    UserId,
};

/// Filters for event-request listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventRequestFilter {
    /// Restrict to one school
    pub school: Option<SchoolId>,
    /// Restrict to one requester
    pub requested_by: Option<UserId>,
    /// Restrict to one status
    pub status: Option<EventRequestStatus>,
}

/// Database operations for the event-proposal workflow.
#[async_trait]
pub trait EventRequestStore: Send + Sync {
    /// Submit a proposal: resolve the requester's school and create a
    /// `pending` request.
    ///
    /// # Errors
    ///
    /// - `Authorization` unless the requester is a school administrator
    /// - `Validation` when the requester administers no school, or the
    ///   proposal is invalid
    async fn submit_request(
        &self,
        id: EventRequestId,
        requester: &User,
        proposal: Proposal,
        now: DateTime<Utc>,
    ) -> Result<EventRequest>;

    /// Get a request by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn request(&self, id: EventRequestId) -> Result<EventRequest>;

    /// Owner edit; force-sets the status back to `pending`.
    ///
    /// # Errors
    ///
    /// Per [`EventRequest::apply_edit`], plus `NotFound`.
    async fn edit_request(
        &self,
        id: EventRequestId,
        editor: &User,
        patch: ProposalPatch,
        now: DateTime<Utc>,
    ) -> Result<EventRequest>;

    /// Administrator review. On approval, materializes the event under
    /// `new_event_id` and links it, all in one atomic operation.
    ///
    /// Returns the reviewed request and the materialized event, if any.
    ///
    /// # Errors
    ///
    /// Per [`EventRequest::review`], plus `NotFound`.
    async fn review_request(
        &self,
        id: EventRequestId,
        reviewer: &User,
        decision: ReviewDecision,
        note: Option<String>,
        new_event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<(EventRequest, Option<Event>)>;

    /// Delete a request.
    ///
    /// # Errors
    ///
    /// Per [`EventRequest::authorize_delete`], plus `NotFound`.
    async fn delete_request(&self, id: EventRequestId, principal: &User) -> Result<()>;

    /// List requests, newest first.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn list_requests(
        &self,
        filter: EventRequestFilter,
        page: Page,
    ) -> Result<Paginated<EventRequest>>;
}

/// Filters for speaker-application listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpeakerRequestFilter {
    /// Restrict to one event
    pub event: Option<EventId>,
    /// Restrict to one speaker
    pub speaker: Option<UserId>,
    /// Restrict to applications against events this user organizes
    pub organizer: Option<UserId>,
    /// Restrict to one status
    pub status: Option<SpeakerRequestStatus>,
}

/// Database operations for the speaker-application workflow.
#[async_trait]
pub trait SpeakerRequestStore: Send + Sync {
    /// Submit an application against a published event. The duplicate
    /// pre-check and the storage uniqueness constraint both surface as the
    /// same `Conflict`.
    ///
    /// # Errors
    ///
    /// Per [`SpeakerRequest::submit`], plus `NotFound` for the event and
    /// `Conflict` for a duplicate application.
    async fn submit_application(
        &self,
        id: SpeakerRequestId,
        event_id: EventId,
        speaker: &User,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest>;

    /// Get an application by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn application(&self, id: SpeakerRequestId) -> Result<SpeakerRequest>;

    /// Owner edit; force-sets the status back to `pending`.
    ///
    /// # Errors
    ///
    /// Per [`SpeakerRequest::apply_edit`], plus `NotFound`.
    async fn edit_application(
        &self,
        id: SpeakerRequestId,
        editor: &User,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest>;

    /// Organizer or administrator review. On approval, re-checks the
    /// event's speaker ceiling and appends the speaker slot, all in one
    /// atomic operation.
    ///
    /// # Errors
    ///
    /// Per [`SpeakerRequest::review`], plus `NotFound` and `Capacity` when
    /// approving would exceed the ceiling.
    async fn review_application(
        &self,
        id: SpeakerRequestId,
        reviewer: &User,
        decision: SpeakerReviewDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest>;

    /// Withdraw an application.
    ///
    /// # Errors
    ///
    /// Per [`SpeakerRequest::authorize_delete`], plus `NotFound`.
    async fn delete_application(&self, id: SpeakerRequestId, principal: &User) -> Result<()>;

    /// List applications, newest first.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn list_applications(
        &self,
        filter: SpeakerRequestFilter,
        page: Page,
    ) -> Result<Paginated<SpeakerRequest>>;
}
