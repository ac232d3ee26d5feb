//! In-memory event store.

use super::{paginate, MemoryStore, State};
use crate::traits::{EventFilter, EventStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::workflow::speaker_request::{
    Application, DUPLICATE_APPLICATION, SPEAKER_LIMIT_REACHED,
};
use lectern_core::{
    Capability, DomainError, Event, EventId, EventRegistration, EventSpeaker, Page, Paginated,
    Result, SpeakerSlotStatus, User, UserId,
};

pub(crate) fn approved_slots(state: &State, event_id: EventId) -> u32 {
    let count = state
        .event_speakers
        .values()
        .filter(|s| s.event_id == event_id && s.status == SpeakerSlotStatus::Approved)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn registration_count(state: &State, event_id: EventId) -> u32 {
    let count = state
        .registrations
        .values()
        .filter(|r| r.event_id == event_id)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, event: &Event) -> Result<()> {
        self.write().events.insert(event.id, event.clone());
        Ok(())
    }

    async fn event(&self, id: EventId) -> Result<Event> {
        self.read()
            .events
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Event"))
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let mut state = self.write();
        if !state.events.contains_key(&event.id) {
            return Err(DomainError::not_found("Event"));
        }
        state.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        let mut state = self.write();
        if state.events.remove(&id).is_none() {
            return Err(DomainError::not_found("Event"));
        }
        state.event_speakers.retain(|(event, _), _| *event != id);
        state.registrations.retain(|(event, _), _| *event != id);
        state.feedback.retain(|_, f| f.event_id != id);
        state.speaker_requests.retain(|_, r| r.event_id != id);
        Ok(())
    }

    async fn list_events(&self, filter: EventFilter, page: Page) -> Result<Paginated<Event>> {
        let state = self.read();
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| filter.status.is_none_or(|status| e.status == status))
            .filter(|e| filter.school.is_none_or(|school| e.host_school == school))
            .filter(|e| filter.organizer.is_none_or(|organizer| e.organizer == organizer))
            .filter(|e| !filter.public_only || e.is_public)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.to_string().cmp(&b.id.to_string())));
        Ok(paginate(&events, page))
    }

    async fn register_attendee(
        &self,
        event_id: EventId,
        student: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.write();
        let event = state
            .events
            .get(&event_id)
            .ok_or(DomainError::not_found("Event"))?;
        if !event.is_published() {
            return Err(DomainError::invalid_state(
                "Registration is only open for published events",
            ));
        }
        if state.registrations.contains_key(&(event_id, student)) {
            return Err(DomainError::conflict(
                "You are already registered for this event",
            ));
        }
        if !event.has_seat_for(registration_count(&state, event_id)) {
            return Err(DomainError::capacity("This event is at full capacity"));
        }
        state.registrations.insert(
            (event_id, student),
            EventRegistration {
                event_id,
                user_id: student,
                registered_at: now,
            },
        );
        Ok(())
    }

    async fn unregister_attendee(&self, event_id: EventId, student: UserId) -> Result<()> {
        let mut state = self.write();
        if !state.events.contains_key(&event_id) {
            return Err(DomainError::not_found("Event"));
        }
        state
            .registrations
            .remove(&(event_id, student))
            .map(|_| ())
            .ok_or(DomainError::not_found("Registration"))
    }

    async fn registrations(&self, event_id: EventId) -> Result<Vec<EventRegistration>> {
        let state = self.read();
        if !state.events.contains_key(&event_id) {
            return Err(DomainError::not_found("Event"));
        }
        let mut registrations: Vec<EventRegistration> = state
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(registrations)
    }

    async fn speakers(&self, event_id: EventId) -> Result<Vec<EventSpeaker>> {
        let state = self.read();
        if !state.events.contains_key(&event_id) {
            return Err(DomainError::not_found("Event"));
        }
        let mut speakers: Vec<EventSpeaker> = state
            .event_speakers
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        speakers.sort_by(|a, b| a.added_at.cmp(&b.added_at));
        Ok(speakers)
    }

    async fn approved_speaker_count(&self, event_id: EventId) -> Result<u32> {
        Ok(approved_slots(&self.read(), event_id))
    }

    async fn apply_speaker_slot(
        &self,
        event_id: EventId,
        speaker: &User,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<EventSpeaker> {
        let mut state = self.write();
        let event = state
            .events
            .get(&event_id)
            .ok_or(DomainError::not_found("Event"))?;
        speaker.role.require(Capability::ApplyAsSpeaker)?;
        if !event.is_published() {
            return Err(DomainError::invalid_state(
                "Speaker applications are only open for published events",
            ));
        }
        application.validate()?;
        if state.event_speakers.contains_key(&(event_id, speaker.id)) {
            return Err(DomainError::conflict(DUPLICATE_APPLICATION));
        }
        if !event.has_speaker_slot_for(approved_slots(&state, event_id)) {
            return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
        }
        let slot = EventSpeaker {
            event_id,
            user_id: speaker.id,
            topic: application.topic,
            duration_minutes: application.duration_minutes,
            status: SpeakerSlotStatus::Pending,
            added_at: now,
        };
        state
            .event_speakers
            .insert((event_id, speaker.id), slot.clone());
        Ok(slot)
    }

    async fn review_speaker_slot(
        &self,
        event_id: EventId,
        speaker: UserId,
        reviewer: &User,
        target: SpeakerSlotStatus,
    ) -> Result<EventSpeaker> {
        let mut state = self.write();
        let event = state
            .events
            .get(&event_id)
            .cloned()
            .ok_or(DomainError::not_found("Event"))?;
        event.authorize_speaker_review(reviewer)?;
        if target == SpeakerSlotStatus::Pending {
            return Err(DomainError::validation(
                "Review status must be one of: approved, rejected",
            ));
        }
        let approved = approved_slots(&state, event_id);
        let slot = state
            .event_speakers
            .get_mut(&(event_id, speaker))
            .ok_or(DomainError::not_found("Speaker application"))?;
        if slot.status != SpeakerSlotStatus::Pending {
            return Err(DomainError::invalid_state(
                "This application has already been reviewed",
            ));
        }
        if target == SpeakerSlotStatus::Approved && !event.has_speaker_slot_for(approved) {
            return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
        }
        slot.status = target;
        Ok(slot.clone())
    }
}
