//! In-memory store.
//!
//! A full implementation of every store trait backed by plain maps behind
//! one `RwLock`. Holding the whole state behind a single lock gives each
//! operation the same atomicity the PostgreSQL implementation gets from
//! transactions, so the two backends are behaviorally interchangeable.
//! Used by the HTTP test suite and for running the server without a
//! database.

mod events;
mod feedback;
mod reports;
mod requests;
mod schools;
mod sessions;
mod users;

use crate::traits::{LoginCode, Session};
use lectern_core::workflow::event_request::EventRequest;
use lectern_core::workflow::speaker_request::SpeakerRequest;
use lectern_core::{
    Event, EventId, EventRegistration, EventRequestId, EventSpeaker, Feedback, FeedbackId, Page,
    Paginated, School, SchoolId, SpeakerRequestId, User, UserId,
};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The whole platform state.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) schools: HashMap<SchoolId, School>,
    pub(crate) events: HashMap<EventId, Event>,
    pub(crate) event_requests: HashMap<EventRequestId, EventRequest>,
    pub(crate) speaker_requests: HashMap<SpeakerRequestId, SpeakerRequest>,
    pub(crate) event_speakers: HashMap<(EventId, UserId), EventSpeaker>,
    pub(crate) registrations: HashMap<(EventId, UserId), EventRegistration>,
    pub(crate) feedback: HashMap<FeedbackId, Feedback>,
    pub(crate) sessions: HashMap<String, Session>,
    pub(crate) login_codes: HashMap<String, LoginCode>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Page a fully collected result set.
pub(crate) fn paginate<T: Clone>(items: &[T], page: Page) -> Paginated<T> {
    Paginated::new(page.slice(items), items.len() as u64, page)
}
