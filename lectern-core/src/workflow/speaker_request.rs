//! The speaker-application workflow.
//!
//! States: `pending -> {approved, rejected, waitlisted}`. `approved` and
//! `rejected` are terminal; `waitlisted` deliberately is not: a waitlisted
//! application stays in the reviewer's queue and may be reviewed again
//! later (for instance when an approved speaker withdraws). Approval
//! appends a speaker slot to the target event after re-checking the
//! event's speaker ceiling; the re-check and the append are executed by the
//! store inside one atomic operation.
//!
//! One application per (event, speaker) pair: duplicates are rejected by a
//! pre-check and again by a storage uniqueness constraint, both surfaced as
//! the same `Conflict`.

use crate::error::{DomainError, Result};
use crate::event::{Event, EventSpeaker, SpeakerSlotStatus};
use crate::role::{Capability, Role};
use crate::types::{EventId, SpeakerRequestId, UserId};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message surfaced for a duplicate application, from either the pre-check
/// or the storage constraint backstop.
pub const DUPLICATE_APPLICATION: &str = "You have already applied to present at this event";

/// Message surfaced when the speaker ceiling is or would be full.
pub const SPEAKER_LIMIT_REACHED: &str = "This event has reached its speaker limit";

/// Status of a speaker application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRequestStatus {
    /// Awaiting review
    Pending,
    /// Confirmed; a speaker slot exists on the event; terminal
    Approved,
    /// Turned down; terminal
    Rejected,
    /// Parked; stays reviewable
    Waitlisted,
}

impl SpeakerRequestStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Waitlisted => "waitlisted",
        }
    }

    /// Terminal statuses admit no further edit or review.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Whether a reviewer may (re-)review from this status.
    #[must_use]
    pub const fn is_reviewable(self) -> bool {
        matches!(self, Self::Pending | Self::Waitlisted)
    }
}

impl fmt::Display for SpeakerRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeakerRequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "waitlisted" => Ok(Self::Waitlisted),
            other => Err(DomainError::validation(format!(
                "Invalid application status: {other}"
            ))),
        }
    }
}

/// A reviewer's verdict on a speaker application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakerReviewDecision {
    /// Approve and append a speaker slot to the event
    Approve,
    /// Turn down permanently
    Reject,
    /// Park on the waitlist; stays reviewable
    Waitlist,
}

impl SpeakerReviewDecision {
    /// Parse the review's target status from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for any status outside the
    /// reviewable set.
    pub fn parse(status: &str) -> Result<Self> {
        match status {
            "approved" => Ok(Self::Approve),
            "rejected" => Ok(Self::Reject),
            "waitlisted" => Ok(Self::Waitlist),
            _ => Err(DomainError::validation(
                "Review status must be one of: approved, rejected, waitlisted",
            )),
        }
    }

    /// The status this decision moves the application to.
    #[must_use]
    pub const fn resulting_status(self) -> SpeakerRequestStatus {
        match self {
            Self::Approve => SpeakerRequestStatus::Approved,
            Self::Reject => SpeakerRequestStatus::Rejected,
            Self::Waitlist => SpeakerRequestStatus::Waitlisted,
        }
    }
}

/// The talk a speaker proposes to give.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Talk topic
    pub topic: String,
    /// Speaker bio for the program
    pub bio: Option<String>,
    /// Talk length in minutes
    pub duration_minutes: u32,
}

impl Application {
    /// Check the talk's fields.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(DomainError::validation("Topic is required"));
        }
        if self.duration_minutes == 0 || self.duration_minutes > 480 {
            return Err(DomainError::validation(
                "Talk duration must be between 1 and 480 minutes",
            ));
        }
        Ok(())
    }
}

/// A partial update to an application; `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationPatch {
    /// New topic
    pub topic: Option<String>,
    /// New bio
    pub bio: Option<String>,
    /// New duration in minutes
    pub duration_minutes: Option<u32>,
}

/// A speaker's application to present at one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerRequest {
    /// Unique application identifier
    pub id: SpeakerRequestId,
    /// The target event
    pub event_id: EventId,
    /// The applying speaker; owns edits and withdrawal
    pub speaker_id: UserId,
    /// The proposed talk
    pub application: Application,
    /// Workflow status
    pub status: SpeakerRequestStatus,
    /// Reviewer's note from the last review
    pub review_note: Option<String>,
    /// When the application was submitted
    pub created_at: DateTime<Utc>,
    /// When the application was last modified
    pub updated_at: DateTime<Utc>,
}

impl SpeakerRequest {
    /// Submit an application against a published event.
    ///
    /// `approved_count` is the number of already-approved applications for
    /// the event at submission time; the ceiling is re-checked at review
    /// time as well, since other applications may be approved in between.
    ///
    /// # Errors
    ///
    /// - `Authorization` unless the applicant's role is speaker
    /// - `InvalidState` unless the event is published
    /// - `Validation` for an invalid talk
    /// - `Capacity` when the event's speaker ceiling is already reached
    pub fn submit(
        id: SpeakerRequestId,
        event: &Event,
        speaker: &User,
        application: Application,
        approved_count: u32,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        speaker.role.require(Capability::ApplyAsSpeaker)?;
        if !event.is_published() {
            return Err(DomainError::invalid_state(
                "Speaker applications are only open for published events",
            ));
        }
        application.validate()?;
        if !event.has_speaker_slot_for(approved_count) {
            return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
        }
        Ok(Self {
            id,
            event_id: event.id,
            speaker_id: speaker.id,
            application,
            status: SpeakerRequestStatus::Pending,
            review_note: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Owner edit. Force-sets the status back to `pending`, also from the
    /// waitlist.
    ///
    /// # Errors
    ///
    /// - `Ownership` unless the editor is the applicant
    /// - `InvalidState` once the application is approved or rejected
    /// - `Validation` if the patched talk is invalid
    pub fn apply_edit(
        &mut self,
        editor: &User,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.speaker_id != editor.id {
            return Err(DomainError::ownership(
                "You can only edit your own applications",
            ));
        }
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(
                "This application has already been reviewed and can no longer be edited",
            ));
        }

        let mut application = self.application.clone();
        if let Some(topic) = patch.topic {
            application.topic = topic;
        }
        if let Some(bio) = patch.bio {
            application.bio = Some(bio);
        }
        if let Some(duration) = patch.duration_minutes {
            application.duration_minutes = duration;
        }
        application.validate()?;

        self.application = application;
        self.status = SpeakerRequestStatus::Pending;
        self.updated_at = now;
        Ok(())
    }

    /// Organizer or administrator review.
    ///
    /// A pending or waitlisted application may be reviewed; approved and
    /// rejected ones may not. On approval the caller re-checks the speaker
    /// ceiling and appends the slot via [`Self::to_event_speaker`] inside
    /// the same atomic store operation.
    ///
    /// # Errors
    ///
    /// - `Authorization`/`Ownership` unless the reviewer organizes the event
    ///   or is a platform administrator
    /// - `Unexpected` if the event passed in is not this application's event
    /// - `InvalidState` when the application is approved or rejected
    pub fn review(
        &mut self,
        reviewer: &User,
        event: &Event,
        decision: SpeakerReviewDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        event.authorize_speaker_review(reviewer)?;
        if event.id != self.event_id {
            return Err(DomainError::unexpected(
                "Application does not belong to this event",
            ));
        }
        if !self.status.is_reviewable() {
            return Err(DomainError::invalid_state(
                "This application has already been reviewed",
            ));
        }
        self.status = decision.resulting_status();
        self.review_note = note;
        self.updated_at = now;
        Ok(())
    }

    /// Build the speaker slot this approved application describes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the application is `approved`.
    pub fn to_event_speaker(&self, now: DateTime<Utc>) -> Result<EventSpeaker> {
        if self.status != SpeakerRequestStatus::Approved {
            return Err(DomainError::invalid_state(
                "Only approved applications become speakers",
            ));
        }
        Ok(EventSpeaker {
            event_id: self.event_id,
            user_id: self.speaker_id,
            topic: self.application.topic.clone(),
            duration_minutes: self.application.duration_minutes,
            status: SpeakerSlotStatus::Approved,
            added_at: now,
        })
    }

    /// Fail unless the principal may withdraw this application.
    ///
    /// The applicant or any platform administrator may withdraw, except an
    /// approved application: its speaker slot on the event would be left
    /// dangling, so it must be rejected by the organizer first.
    ///
    /// # Errors
    ///
    /// - `Ownership` for anyone else
    /// - `InvalidState` when the application is approved
    pub fn authorize_delete(&self, principal: &User) -> Result<()> {
        if principal.role != Role::SuperAdmin && principal.id != self.speaker_id {
            return Err(DomainError::ownership(
                "You can only withdraw your own applications",
            ));
        }
        if self.status == SpeakerRequestStatus::Approved {
            return Err(DomainError::invalid_state(
                "Approved applications cannot be withdrawn",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStatus;
    use crate::role::Role;
    use crate::types::{Capacity, SchoolId};

    fn user(role: Role) -> User {
        User::new(UserId::new(), "user@school.edu", "User", role, Utc::now()).expect("valid user")
    }

    fn event(organizer: UserId, max_speakers: u32) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            title: "Career Day".to_string(),
            description: "Industry talks".to_string(),
            host_school: SchoolId::new(),
            organizer,
            date: now,
            location: "Auditorium".to_string(),
            capacity: Capacity::new(100),
            price_cents: 0,
            max_speakers,
            requirements: None,
            status: EventStatus::Published,
            is_public: true,
            average_rating: 0.0,
            total_ratings: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn application() -> Application {
        Application {
            topic: "Careers in engineering".to_string(),
            bio: None,
            duration_minutes: 30,
        }
    }

    fn submitted(event: &Event) -> (SpeakerRequest, User) {
        let speaker = user(Role::Speaker);
        let request = SpeakerRequest::submit(
            SpeakerRequestId::new(),
            event,
            &speaker,
            application(),
            0,
            Utc::now(),
        )
        .expect("submit succeeds");
        (request, speaker)
    }

    #[test]
    fn submit_starts_pending() {
        let e = event(UserId::new(), 3);
        let (request, speaker) = submitted(&e);
        assert_eq!(request.status, SpeakerRequestStatus::Pending);
        assert_eq!(request.speaker_id, speaker.id);
        assert_eq!(request.event_id, e.id);
    }

    #[test]
    fn only_speakers_apply() {
        let e = event(UserId::new(), 3);
        for role in [Role::Student, Role::SchoolAdmin, Role::SuperAdmin] {
            let not_speaker = user(role);
            let err = SpeakerRequest::submit(
                SpeakerRequestId::new(),
                &e,
                &not_speaker,
                application(),
                0,
                Utc::now(),
            )
            .expect_err("must fail");
            assert!(matches!(err, DomainError::Authorization(_)), "{role:?}");
        }
    }

    #[test]
    fn unpublished_events_refuse_applications() {
        for status in [
            EventStatus::Draft,
            EventStatus::Cancelled,
            EventStatus::Completed,
        ] {
            let mut e = event(UserId::new(), 3);
            e.status = status;
            let speaker = user(Role::Speaker);
            let err = SpeakerRequest::submit(
                SpeakerRequestId::new(),
                &e,
                &speaker,
                application(),
                0,
                Utc::now(),
            )
            .expect_err("must fail");
            assert!(matches!(err, DomainError::InvalidState(_)), "{status:?}");
        }
    }

    #[test]
    fn full_events_refuse_applications() {
        let e = event(UserId::new(), 1);
        let speaker = user(Role::Speaker);
        let err = SpeakerRequest::submit(
            SpeakerRequestId::new(),
            &e,
            &speaker,
            application(),
            1,
            Utc::now(),
        )
        .expect_err("must fail");
        assert_eq!(err, DomainError::Capacity(SPEAKER_LIMIT_REACHED.to_string()));
    }

    #[test]
    fn organizer_reviews_their_event() {
        let organizer = user(Role::SchoolAdmin);
        let e = event(organizer.id, 3);
        let (mut request, _) = submitted(&e);
        request
            .review(
                &organizer,
                &e,
                SpeakerReviewDecision::Approve,
                None,
                Utc::now(),
            )
            .expect("review succeeds");
        assert_eq!(request.status, SpeakerRequestStatus::Approved);
    }

    #[test]
    fn other_school_admin_cannot_review() {
        let e = event(UserId::new(), 3);
        let (mut request, _) = submitted(&e);
        let other_admin = user(Role::SchoolAdmin);
        let err = request
            .review(
                &other_admin,
                &e,
                SpeakerReviewDecision::Approve,
                None,
                Utc::now(),
            )
            .expect_err("must fail");
        assert!(matches!(err, DomainError::Ownership(_)));
    }

    #[test]
    fn super_admin_reviews_any_event() {
        let e = event(UserId::new(), 3);
        let (mut request, _) = submitted(&e);
        request
            .review(
                &user(Role::SuperAdmin),
                &e,
                SpeakerReviewDecision::Reject,
                Some("Program is full".to_string()),
                Utc::now(),
            )
            .expect("review succeeds");
        assert_eq!(request.status, SpeakerRequestStatus::Rejected);
        assert_eq!(request.review_note.as_deref(), Some("Program is full"));
    }

    #[test]
    fn waitlisted_stays_reviewable() {
        let organizer = user(Role::SchoolAdmin);
        let e = event(organizer.id, 3);
        let (mut request, _) = submitted(&e);
        request
            .review(
                &organizer,
                &e,
                SpeakerReviewDecision::Waitlist,
                None,
                Utc::now(),
            )
            .expect("waitlist succeeds");
        assert_eq!(request.status, SpeakerRequestStatus::Waitlisted);

        // A waitlisted application can be picked up again later.
        request
            .review(
                &organizer,
                &e,
                SpeakerReviewDecision::Approve,
                None,
                Utc::now(),
            )
            .expect("second review succeeds");
        assert_eq!(request.status, SpeakerRequestStatus::Approved);
    }

    #[test]
    fn terminal_applications_refuse_review_and_edit() {
        let organizer = user(Role::SchoolAdmin);
        let e = event(organizer.id, 3);
        for decision in [SpeakerReviewDecision::Approve, SpeakerReviewDecision::Reject] {
            let (mut request, speaker) = submitted(&e);
            request
                .review(&organizer, &e, decision, None, Utc::now())
                .expect("first review succeeds");

            let review_err = request
                .review(
                    &organizer,
                    &e,
                    SpeakerReviewDecision::Waitlist,
                    None,
                    Utc::now(),
                )
                .expect_err("second review must fail");
            assert!(matches!(review_err, DomainError::InvalidState(_)));

            let edit_err = request
                .apply_edit(&speaker, ApplicationPatch::default(), Utc::now())
                .expect_err("edit must fail");
            assert!(matches!(edit_err, DomainError::InvalidState(_)));
        }
    }

    #[test]
    fn owner_edit_returns_waitlisted_to_pending() {
        let organizer = user(Role::SchoolAdmin);
        let e = event(organizer.id, 3);
        let (mut request, speaker) = submitted(&e);
        request
            .review(
                &organizer,
                &e,
                SpeakerReviewDecision::Waitlist,
                None,
                Utc::now(),
            )
            .expect("waitlist succeeds");

        request
            .apply_edit(
                &speaker,
                ApplicationPatch {
                    topic: Some("Careers in robotics".to_string()),
                    ..ApplicationPatch::default()
                },
                Utc::now(),
            )
            .expect("edit succeeds");
        assert_eq!(request.status, SpeakerRequestStatus::Pending);
        assert_eq!(request.application.topic, "Careers in robotics");
    }

    #[test]
    fn approved_application_becomes_a_speaker_slot() {
        let organizer = user(Role::SchoolAdmin);
        let e = event(organizer.id, 3);
        let (mut request, speaker) = submitted(&e);
        request
            .review(
                &organizer,
                &e,
                SpeakerReviewDecision::Approve,
                None,
                Utc::now(),
            )
            .expect("review succeeds");

        let slot = request.to_event_speaker(Utc::now()).expect("slot built");
        assert_eq!(slot.event_id, e.id);
        assert_eq!(slot.user_id, speaker.id);
        assert_eq!(slot.status, SpeakerSlotStatus::Approved);
        assert_eq!(slot.topic, "Careers in engineering");
    }

    #[test]
    fn pending_application_is_not_a_speaker_slot() {
        let e = event(UserId::new(), 3);
        let (request, _) = submitted(&e);
        assert!(request.to_event_speaker(Utc::now()).is_err());
    }

    #[test]
    fn withdrawal_guards() {
        let organizer = user(Role::SchoolAdmin);
        let e = event(organizer.id, 3);
        let (request, speaker) = submitted(&e);
        assert!(request.authorize_delete(&speaker).is_ok());
        assert!(request.authorize_delete(&user(Role::SuperAdmin)).is_ok());
        assert!(matches!(
            request.authorize_delete(&user(Role::Speaker)),
            Err(DomainError::Ownership(_))
        ));

        let (mut approved, speaker) = submitted(&e);
        approved
            .review(
                &organizer,
                &e,
                SpeakerReviewDecision::Approve,
                None,
                Utc::now(),
            )
            .expect("review succeeds");
        assert!(matches!(
            approved.authorize_delete(&speaker),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn review_target_statuses_are_closed() {
        assert!(SpeakerReviewDecision::parse("approved").is_ok());
        assert!(SpeakerReviewDecision::parse("rejected").is_ok());
        assert!(SpeakerReviewDecision::parse("waitlisted").is_ok());
        assert!(matches!(
            SpeakerReviewDecision::parse("needs_revision"),
            Err(DomainError::Validation(_))
        ));
    }
}
