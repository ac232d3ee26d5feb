//! Event store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::workflow::speaker_request::Application;
use lectern_core::{
    Event, EventId, EventRegistration, EventSpeaker, EventStatus, Page, Paginated, Result,
    SchoolId, SpeakerSlotStatus, User, UserId,
};

/// Filters for event listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventFilter {
    /// Restrict to one lifecycle status
    pub status: Option<EventStatus>,
    /// Restrict to one host school
    pub school: Option<SchoolId>,
    /// Restrict to one organizer
    pub organizer: Option<UserId>,
    /// Drop unlisted events (the public catalog view)
    pub public_only: bool,
}

/// Database operations for events and their child records (speaker slots
/// and attendee registrations).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create an event.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn create_event(&self, event: &Event) -> Result<()>;

    /// Get an event by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn event(&self, id: EventId) -> Result<Event>;

    /// Overwrite an event record.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn update_event(&self, event: &Event) -> Result<()>;

    /// Delete an event and its child records.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not resolve.
    async fn delete_event(&self, id: EventId) -> Result<()>;

    /// List events, soonest first.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn list_events(&self, filter: EventFilter, page: Page) -> Result<Paginated<Event>>;

    /// Register a student for an event, atomically with the capacity check.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the event does not resolve
    /// - `InvalidState` unless the event is published
    /// - `Conflict` when the student is already registered
    /// - `Capacity` when the event is at full capacity
    async fn register_attendee(
        &self,
        event_id: EventId,
        student: UserId,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Cancel a registration.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event or the registration does not resolve.
    async fn unregister_attendee(&self, event_id: EventId, student: UserId) -> Result<()>;

    /// All registrations for an event, oldest first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not resolve.
    async fn registrations(&self, event_id: EventId) -> Result<Vec<EventRegistration>>;

    /// All speaker slots for an event, oldest first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not resolve.
    async fn speakers(&self, event_id: EventId) -> Result<Vec<EventSpeaker>>;

    /// Number of approved speaker slots for an event.
    ///
    /// # Errors
    ///
    /// `Unexpected` on storage failure.
    async fn approved_speaker_count(&self, event_id: EventId) -> Result<u32>;

    /// The legacy in-event application path: create a `pending` speaker
    /// slot directly on the event.
    ///
    /// # Errors
    ///
    /// - `Authorization`/`InvalidState`/`Validation`/`Capacity` per the
    ///   workflow submit guards
    /// - `Conflict` when the speaker already holds a slot on this event
    async fn apply_speaker_slot(
        &self,
        event_id: EventId,
        speaker: &User,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<EventSpeaker>;

    /// The legacy in-event review path: move a speaker slot to
    /// approved/rejected, atomically with the ceiling re-check on approve.
    ///
    /// # Errors
    ///
    /// - `Authorization`/`Ownership` unless the reviewer organizes the
    ///   event or is a platform administrator
    /// - `NotFound` when the slot does not resolve
    /// - `InvalidState` when the slot is no longer pending
    /// - `Capacity` when approving would exceed the speaker ceiling
    async fn review_speaker_slot(
        &self,
        event_id: EventId,
        speaker: UserId,
        reviewer: &User,
        target: SpeakerSlotStatus,
    ) -> Result<EventSpeaker>;
}
