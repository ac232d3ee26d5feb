//! In-memory workflow stores.

use super::events::approved_slots;
use super::{paginate, MemoryStore};
use crate::traits::{EventRequestFilter, EventRequestStore, SpeakerRequestFilter, SpeakerRequestStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::workflow::event_request::{EventRequest, Proposal, ProposalPatch, ReviewDecision};
use lectern_core::workflow::speaker_request::{
    Application, ApplicationPatch, SpeakerRequest, SpeakerReviewDecision, DUPLICATE_APPLICATION,
    SPEAKER_LIMIT_REACHED,
};
use lectern_core::{
    Capability, DomainError, Event, EventId, EventRequestId, Page, Paginated, Result,
    SpeakerRequestId, User,
};

#[async_trait]
impl EventRequestStore for MemoryStore {
    async fn submit_request(
        &self,
        id: EventRequestId,
        requester: &User,
        proposal: Proposal,
        now: DateTime<Utc>,
    ) -> Result<EventRequest> {
        let mut state = self.write();
        requester.role.require(Capability::SubmitEventRequest)?;
        let school = state
            .schools
            .values()
            .find(|s| s.is_administered_by(requester.id))
            .cloned()
            .ok_or_else(|| {
                DomainError::validation("You are not associated with any school")
            })?;
        let request = EventRequest::submit(id, &school, requester, proposal, now)?;
        state.event_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn request(&self, id: EventRequestId) -> Result<EventRequest> {
        self.read()
            .event_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Event request"))
    }

    async fn edit_request(
        &self,
        id: EventRequestId,
        editor: &User,
        patch: ProposalPatch,
        now: DateTime<Utc>,
    ) -> Result<EventRequest> {
        let mut state = self.write();
        let mut request = state
            .event_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Event request"))?;
        request.apply_edit(editor, patch, now)?;
        state.event_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn review_request(
        &self,
        id: EventRequestId,
        reviewer: &User,
        decision: ReviewDecision,
        note: Option<String>,
        new_event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<(EventRequest, Option<Event>)> {
        let mut state = self.write();
        let mut request = state
            .event_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Event request"))?;
        request.review(reviewer, decision, note, now)?;

        let event = if decision == ReviewDecision::Approve {
            let event = request.materialize(new_event_id, now)?;
            request.link_approved_event(event.id)?;
            state.events.insert(event.id, event.clone());
            Some(event)
        } else {
            None
        };

        state.event_requests.insert(id, request.clone());
        Ok((request, event))
    }

    async fn delete_request(&self, id: EventRequestId, principal: &User) -> Result<()> {
        let mut state = self.write();
        let request = state
            .event_requests
            .get(&id)
            .ok_or(DomainError::not_found("Event request"))?;
        request.authorize_delete(principal)?;
        state.event_requests.remove(&id);
        Ok(())
    }

    async fn list_requests(
        &self,
        filter: EventRequestFilter,
        page: Page,
    ) -> Result<Paginated<EventRequest>> {
        let state = self.read();
        let mut requests: Vec<EventRequest> = state
            .event_requests
            .values()
            .filter(|r| filter.school.is_none_or(|school| r.school_id == school))
            .filter(|r| filter.requested_by.is_none_or(|user| r.requested_by == user))
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .cloned()
            .collect();
        requests.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(paginate(&requests, page))
    }
}

#[async_trait]
impl SpeakerRequestStore for MemoryStore {
    async fn submit_application(
        &self,
        id: SpeakerRequestId,
        event_id: EventId,
        speaker: &User,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest> {
        let mut state = self.write();
        let event = state
            .events
            .get(&event_id)
            .cloned()
            .ok_or(DomainError::not_found("Event"))?;
        if state
            .speaker_requests
            .values()
            .any(|r| r.event_id == event_id && r.speaker_id == speaker.id)
        {
            return Err(DomainError::conflict(DUPLICATE_APPLICATION));
        }
        // Approved slots on the event are the capacity source of truth;
        // they cover both workflow approvals and the legacy in-event path.
        let approved = approved_slots(&state, event_id);
        let request = SpeakerRequest::submit(id, &event, speaker, application, approved, now)?;
        state.speaker_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn application(&self, id: SpeakerRequestId) -> Result<SpeakerRequest> {
        self.read()
            .speaker_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Speaker request"))
    }

    async fn edit_application(
        &self,
        id: SpeakerRequestId,
        editor: &User,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest> {
        let mut state = self.write();
        let mut request = state
            .speaker_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Speaker request"))?;
        request.apply_edit(editor, patch, now)?;
        state.speaker_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn review_application(
        &self,
        id: SpeakerRequestId,
        reviewer: &User,
        decision: SpeakerReviewDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest> {
        let mut state = self.write();
        let mut request = state
            .speaker_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Speaker request"))?;
        let event = state
            .events
            .get(&request.event_id)
            .cloned()
            .ok_or(DomainError::not_found("Event"))?;

        request.review(reviewer, &event, decision, note, now)?;
        if decision == SpeakerReviewDecision::Approve {
            // Capacity is re-derived under the lock: approvals that landed
            // since submission count against the ceiling.
            if !event.has_speaker_slot_for(approved_slots(&state, event.id)) {
                return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
            }
            let slot = request.to_event_speaker(now)?;
            state
                .event_speakers
                .insert((slot.event_id, slot.user_id), slot);
        }
        state.speaker_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn delete_application(&self, id: SpeakerRequestId, principal: &User) -> Result<()> {
        let mut state = self.write();
        let request = state
            .speaker_requests
            .get(&id)
            .ok_or(DomainError::not_found("Speaker request"))?;
        request.authorize_delete(principal)?;
        state.speaker_requests.remove(&id);
        Ok(())
    }

    async fn list_applications(
        &self,
        filter: SpeakerRequestFilter,
        page: Page,
    ) -> Result<Paginated<SpeakerRequest>> {
        let state = self.read();
        let mut requests: Vec<SpeakerRequest> = state
            .speaker_requests
            .values()
            .filter(|r| filter.event.is_none_or(|event| r.event_id == event))
            .filter(|r| filter.speaker.is_none_or(|speaker| r.speaker_id == speaker))
            .filter(|r| {
                filter.organizer.is_none_or(|organizer| {
                    state
                        .events
                        .get(&r.event_id)
                        .is_some_and(|e| e.organizer == organizer)
                })
            })
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .cloned()
            .collect();
        requests.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(paginate(&requests, page))
    }
}
