//! The event-proposal workflow.
//!
//! States: `pending -> {approved, rejected, needs_revision}`. `pending` is
//! the only initial state; `approved` and `rejected` are terminal.
//! `needs_revision` returns to `pending` the moment the owner edits the
//! record: any owner edit of a non-terminal request force-sets `pending`,
//! unconditionally. Approval materializes an [`Event`] from the proposed
//! fields and links it back through `approved_event`, which is set exactly
//! once and never reassigned.

use crate::error::{DomainError, Result};
use crate::event::{Event, EventStatus};
use crate::role::{Capability, Role};
use crate::school::School;
use crate::types::{Capacity, EventId, EventRequestId, SchoolId, UserId};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of an event proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRequestStatus {
    /// Awaiting administrator review
    Pending,
    /// Approved and materialized; terminal
    Approved,
    /// Turned down; terminal
    Rejected,
    /// Sent back to the school for changes
    NeedsRevision,
}

impl EventRequestStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NeedsRevision => "needs_revision",
        }
    }

    /// Terminal statuses admit no further edit or review.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for EventRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventRequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "needs_revision" => Ok(Self::NeedsRevision),
            other => Err(DomainError::validation(format!(
                "Invalid request status: {other}"
            ))),
        }
    }
}

/// An administrator's verdict on a pending proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Approve and materialize an event
    Approve,
    /// Reject permanently
    Reject,
    /// Send back for changes
    RequestRevision,
}

impl ReviewDecision {
    /// Parse the review's target status from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for any status outside the
    /// reviewable set; a review cannot target `pending`.
    pub fn parse(status: &str) -> Result<Self> {
        match status {
            "approved" => Ok(Self::Approve),
            "rejected" => Ok(Self::Reject),
            "needs_revision" => Ok(Self::RequestRevision),
            _ => Err(DomainError::validation(
                "Review status must be one of: approved, rejected, needs_revision",
            )),
        }
    }

    /// The status this decision moves the request to.
    #[must_use]
    pub const fn resulting_status(self) -> EventRequestStatus {
        match self {
            Self::Approve => EventRequestStatus::Approved,
            Self::Reject => EventRequestStatus::Rejected,
            Self::RequestRevision => EventRequestStatus::NeedsRevision,
        }
    }
}

/// The proposed event fields carried by a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposed title
    pub title: String,
    /// Proposed description
    pub description: String,
    /// Proposed date
    pub date: DateTime<Utc>,
    /// Proposed location
    pub location: String,
    /// Expected attendee ceiling
    pub expected_capacity: Capacity,
    /// Proposed ticket price in cents
    pub price_cents: i64,
    /// Proposed speaker-slot ceiling
    pub max_speakers: u32,
    /// Free-text requirements
    pub requirements: Option<String>,
    /// Why the school wants to run this event
    pub justification: Option<String>,
}

impl Proposal {
    /// Check the proposal's fields.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("Title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("Description is required"));
        }
        if self.location.trim().is_empty() {
            return Err(DomainError::validation("Location is required"));
        }
        if self.expected_capacity.value() == 0 {
            return Err(DomainError::validation(
                "Expected capacity must be at least 1",
            ));
        }
        if self.price_cents < 0 {
            return Err(DomainError::validation("Price cannot be negative"));
        }
        Ok(())
    }
}

/// A partial update to a proposal; `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProposalPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New date
    pub date: Option<DateTime<Utc>>,
    /// New location
    pub location: Option<String>,
    /// New attendee ceiling
    pub expected_capacity: Option<Capacity>,
    /// New price in cents
    pub price_cents: Option<i64>,
    /// New speaker-slot ceiling
    pub max_speakers: Option<u32>,
    /// New requirements text
    pub requirements: Option<String>,
    /// New justification text
    pub justification: Option<String>,
}

/// An event proposal owned by a school administrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Unique request identifier
    pub id: EventRequestId,
    /// School the event would belong to
    pub school_id: SchoolId,
    /// The proposing school administrator; owns edits and deletion
    pub requested_by: UserId,
    /// The proposed event fields
    pub proposal: Proposal,
    /// Workflow status
    pub status: EventRequestStatus,
    /// Reviewer's note from the last review
    pub review_note: Option<String>,
    /// The materialized event, set exactly once on approval
    pub approved_event: Option<EventId>,
    /// When the request was submitted
    pub created_at: DateTime<Utc>,
    /// When the request was last modified
    pub updated_at: DateTime<Utc>,
}

impl EventRequest {
    /// Submit a new proposal on behalf of a school.
    ///
    /// The caller resolves the school the requester administers (the school
    /// whose admin or additional admins contain the principal) and passes it
    /// in; a principal administering no school never reaches this function.
    ///
    /// # Errors
    ///
    /// - `Authorization` unless the requester is a school administrator of
    ///   the given school
    /// - `Validation` for an invalid proposal
    pub fn submit(
        id: EventRequestId,
        school: &School,
        requester: &User,
        proposal: Proposal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        requester.role.require(Capability::SubmitEventRequest)?;
        if !school.is_administered_by(requester.id) {
            return Err(DomainError::authorization(
                "You are not an administrator of this school",
            ));
        }
        proposal.validate()?;
        Ok(Self {
            id,
            school_id: school.id,
            requested_by: requester.id,
            proposal,
            status: EventRequestStatus::Pending,
            review_note: None,
            approved_event: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Owner edit.
    ///
    /// Overwrites the provided fields and force-sets the status back to
    /// `pending`, unconditionally. This is how `needs_revision` re-enters
    /// the review queue.
    ///
    /// # Errors
    ///
    /// - `Ownership` unless the editor is the original requester
    /// - `InvalidState` once the request is approved or rejected
    /// - `Validation` if the patched proposal is invalid
    pub fn apply_edit(
        &mut self,
        editor: &User,
        patch: ProposalPatch,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.requested_by != editor.id {
            return Err(DomainError::ownership(
                "You can only edit your own event requests",
            ));
        }
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(
                "This request has already been reviewed and can no longer be edited",
            ));
        }

        let mut proposal = self.proposal.clone();
        if let Some(title) = patch.title {
            proposal.title = title;
        }
        if let Some(description) = patch.description {
            proposal.description = description;
        }
        if let Some(date) = patch.date {
            proposal.date = date;
        }
        if let Some(location) = patch.location {
            proposal.location = location;
        }
        if let Some(capacity) = patch.expected_capacity {
            proposal.expected_capacity = capacity;
        }
        if let Some(price) = patch.price_cents {
            proposal.price_cents = price;
        }
        if let Some(max_speakers) = patch.max_speakers {
            proposal.max_speakers = max_speakers;
        }
        if let Some(requirements) = patch.requirements {
            proposal.requirements = Some(requirements);
        }
        if let Some(justification) = patch.justification {
            proposal.justification = Some(justification);
        }
        proposal.validate()?;

        self.proposal = proposal;
        self.status = EventRequestStatus::Pending;
        self.updated_at = now;
        Ok(())
    }

    /// Administrator review.
    ///
    /// Reviews are not repeatable: only a `pending` request can be reviewed.
    /// On approval the caller must follow up with [`Self::materialize`] and
    /// [`Self::link_approved_event`] within the same atomic store operation.
    ///
    /// # Errors
    ///
    /// - `Authorization` unless the reviewer is a platform administrator
    /// - `InvalidState` unless the request is currently `pending`
    pub fn review(
        &mut self,
        reviewer: &User,
        decision: ReviewDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        reviewer.role.require(Capability::ReviewEventRequest)?;
        if self.status != EventRequestStatus::Pending {
            return Err(DomainError::invalid_state(
                "Only pending requests can be reviewed",
            ));
        }
        self.status = decision.resulting_status();
        self.review_note = note;
        self.updated_at = now;
        Ok(())
    }

    /// Build the event this approved proposal describes.
    ///
    /// The event is born `published` and public, hosted by the proposing
    /// school with the requester as organizer, copying the proposed
    /// schedule, location, capacity, price, requirements, and speaker
    /// ceiling.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the request is `approved`.
    pub fn materialize(&self, event_id: EventId, now: DateTime<Utc>) -> Result<Event> {
        if self.status != EventRequestStatus::Approved {
            return Err(DomainError::invalid_state(
                "Only approved requests can be materialized",
            ));
        }
        Ok(Event {
            id: event_id,
            title: self.proposal.title.clone(),
            description: self.proposal.description.clone(),
            host_school: self.school_id,
            organizer: self.requested_by,
            date: self.proposal.date,
            location: self.proposal.location.clone(),
            capacity: self.proposal.expected_capacity,
            price_cents: self.proposal.price_cents,
            max_speakers: self.proposal.max_speakers,
            requirements: self.proposal.requirements.clone(),
            status: EventStatus::Published,
            is_public: true,
            average_rating: 0.0,
            total_ratings: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Record the materialized event. Set exactly once, never reassigned.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` if a linked event is already recorded.
    pub fn link_approved_event(&mut self, event: EventId) -> Result<()> {
        if self.approved_event.is_some() {
            return Err(DomainError::unexpected(
                "Request is already linked to an approved event",
            ));
        }
        self.approved_event = Some(event);
        Ok(())
    }

    /// Fail unless the principal may delete this request.
    ///
    /// The owner or any platform administrator may delete, but an approved
    /// request cannot be retracted once materialized.
    ///
    /// # Errors
    ///
    /// - `Ownership` for anyone else
    /// - `InvalidState` when the request is approved
    pub fn authorize_delete(&self, principal: &User) -> Result<()> {
        if principal.role != Role::SuperAdmin && principal.id != self.requested_by {
            return Err(DomainError::ownership(
                "You can only delete your own event requests",
            ));
        }
        if self.status == EventRequestStatus::Approved {
            return Err(DomainError::invalid_state(
                "Approved requests cannot be deleted",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use crate::school::School;
    use crate::types::SchoolId;

    fn user(role: Role) -> User {
        User::new(UserId::new(), "user@school.edu", "User", role, Utc::now()).expect("valid user")
    }

    fn school_of(admin: &User) -> School {
        School::new(SchoolId::new(), "Northside High", None, admin.id, Utc::now())
            .expect("valid school")
    }

    fn proposal() -> Proposal {
        Proposal {
            title: "Science Fair".to_string(),
            description: "Annual science fair".to_string(),
            date: Utc::now(),
            location: "Main hall".to_string(),
            expected_capacity: Capacity::new(50),
            price_cents: 0,
            max_speakers: 3,
            requirements: None,
            justification: Some("Tradition".to_string()),
        }
    }

    fn submitted() -> (EventRequest, User) {
        let admin = user(Role::SchoolAdmin);
        let school = school_of(&admin);
        let request = EventRequest::submit(
            EventRequestId::new(),
            &school,
            &admin,
            proposal(),
            Utc::now(),
        )
        .expect("submit succeeds");
        (request, admin)
    }

    #[test]
    fn submit_starts_pending() {
        let (request, admin) = submitted();
        assert_eq!(request.status, EventRequestStatus::Pending);
        assert_eq!(request.requested_by, admin.id);
        assert_eq!(request.approved_event, None);
    }

    #[test]
    fn submit_requires_school_admin_role() {
        let admin = user(Role::SchoolAdmin);
        let school = school_of(&admin);
        for role in [Role::Student, Role::Speaker, Role::SuperAdmin] {
            let other = user(role);
            let err = EventRequest::submit(
                EventRequestId::new(),
                &school,
                &other,
                proposal(),
                Utc::now(),
            )
            .expect_err("must fail");
            assert!(matches!(err, DomainError::Authorization(_)), "{role:?}");
        }
    }

    #[test]
    fn submit_requires_administering_the_school() {
        let admin = user(Role::SchoolAdmin);
        let school = school_of(&admin);
        let stranger = user(Role::SchoolAdmin);
        let err =
            EventRequest::submit(EventRequestId::new(), &school, &stranger, proposal(), Utc::now())
                .expect_err("must fail");
        assert!(matches!(err, DomainError::Authorization(_)));
    }

    #[test]
    fn submit_validates_the_proposal() {
        let admin = user(Role::SchoolAdmin);
        let school = school_of(&admin);
        let mut bad = proposal();
        bad.expected_capacity = Capacity::new(0);
        let err = EventRequest::submit(EventRequestId::new(), &school, &admin, bad, Utc::now())
            .expect_err("must fail");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn owner_edit_forces_pending_from_needs_revision() {
        let (mut request, admin) = submitted();
        let reviewer = user(Role::SuperAdmin);
        request
            .review(
                &reviewer,
                ReviewDecision::RequestRevision,
                Some("Needs a budget".to_string()),
                Utc::now(),
            )
            .expect("review succeeds");
        assert_eq!(request.status, EventRequestStatus::NeedsRevision);

        let patch = ProposalPatch {
            justification: Some("Budget attached".to_string()),
            ..ProposalPatch::default()
        };
        request
            .apply_edit(&admin, patch, Utc::now())
            .expect("edit succeeds");
        assert_eq!(request.status, EventRequestStatus::Pending);
    }

    #[test]
    fn edit_while_pending_stays_pending() {
        let (mut request, admin) = submitted();
        request
            .apply_edit(&admin, ProposalPatch::default(), Utc::now())
            .expect("edit succeeds");
        assert_eq!(request.status, EventRequestStatus::Pending);
    }

    #[test]
    fn non_owner_cannot_edit() {
        let (mut request, _) = submitted();
        let other = user(Role::SchoolAdmin);
        let err = request
            .apply_edit(&other, ProposalPatch::default(), Utc::now())
            .expect_err("must fail");
        assert!(matches!(err, DomainError::Ownership(_)));
    }

    #[test]
    fn terminal_requests_refuse_edit_and_review() {
        for decision in [ReviewDecision::Approve, ReviewDecision::Reject] {
            let (mut request, admin) = submitted();
            let reviewer = user(Role::SuperAdmin);
            request
                .review(&reviewer, decision, None, Utc::now())
                .expect("first review succeeds");

            let edit_err = request
                .apply_edit(&admin, ProposalPatch::default(), Utc::now())
                .expect_err("edit must fail");
            assert!(matches!(edit_err, DomainError::InvalidState(_)));

            let review_err = request
                .review(&reviewer, ReviewDecision::Reject, None, Utc::now())
                .expect_err("second review must fail");
            assert!(matches!(review_err, DomainError::InvalidState(_)));
        }
    }

    #[test]
    fn school_admin_cannot_review_even_their_own_request() {
        let (mut request, admin) = submitted();
        let err = request
            .review(&admin, ReviewDecision::Approve, None, Utc::now())
            .expect_err("must fail");
        assert_eq!(
            err,
            DomainError::Authorization(
                "Only platform administrators can review event requests".to_string()
            )
        );
    }

    #[test]
    fn review_target_statuses_are_closed() {
        assert!(ReviewDecision::parse("approved").is_ok());
        assert!(ReviewDecision::parse("rejected").is_ok());
        assert!(ReviewDecision::parse("needs_revision").is_ok());
        assert!(matches!(
            ReviewDecision::parse("pending"),
            Err(DomainError::Validation(_))
        ));
        assert!(ReviewDecision::parse("waitlisted").is_err());
    }

    #[test]
    fn approval_materializes_a_published_public_event() {
        let (mut request, admin) = submitted();
        let reviewer = user(Role::SuperAdmin);
        request
            .review(&reviewer, ReviewDecision::Approve, None, Utc::now())
            .expect("review succeeds");

        let event_id = EventId::new();
        let event = request
            .materialize(event_id, Utc::now())
            .expect("materialize succeeds");
        request
            .link_approved_event(event.id)
            .expect("link succeeds");

        assert_eq!(event.id, event_id);
        assert_eq!(event.host_school, request.school_id);
        assert_eq!(event.organizer, admin.id);
        assert_eq!(event.capacity, Capacity::new(50));
        assert_eq!(event.max_speakers, 3);
        assert_eq!(event.date, request.proposal.date);
        assert_eq!(event.location, request.proposal.location);
        assert_eq!(event.status, EventStatus::Published);
        assert!(event.is_public);
        assert_eq!(request.approved_event, Some(event_id));
    }

    #[test]
    fn approved_event_link_is_set_exactly_once() {
        let (mut request, _) = submitted();
        let reviewer = user(Role::SuperAdmin);
        request
            .review(&reviewer, ReviewDecision::Approve, None, Utc::now())
            .expect("review succeeds");
        request
            .link_approved_event(EventId::new())
            .expect("first link succeeds");
        assert!(request.link_approved_event(EventId::new()).is_err());
    }

    #[test]
    fn materialize_requires_approved_status() {
        let (request, _) = submitted();
        let err = request
            .materialize(EventId::new(), Utc::now())
            .expect_err("must fail");
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn delete_guards() {
        let (request, admin) = submitted();
        assert!(request.authorize_delete(&admin).is_ok());
        assert!(request.authorize_delete(&user(Role::SuperAdmin)).is_ok());
        assert!(matches!(
            request.authorize_delete(&user(Role::SchoolAdmin)),
            Err(DomainError::Ownership(_))
        ));

        let (mut approved, admin) = submitted();
        approved
            .review(&user(Role::SuperAdmin), ReviewDecision::Approve, None, Utc::now())
            .expect("review succeeds");
        assert!(matches!(
            approved.authorize_delete(&admin),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn rejected_requests_can_still_be_deleted() {
        let (mut request, admin) = submitted();
        request
            .review(&user(Role::SuperAdmin), ReviewDecision::Reject, None, Utc::now())
            .expect("review succeeds");
        assert!(request.authorize_delete(&admin).is_ok());
    }
}
