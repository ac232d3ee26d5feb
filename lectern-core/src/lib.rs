//! Domain model for Lectern, a multi-tenant educational-event platform.
//!
//! Schools propose events, a platform administrator reviews the proposals,
//! speakers apply to present at published events, and students register and
//! leave feedback. This crate contains the pure domain: entities, the closed
//! role/capability model, and the two approval workflows
//! ([`EventRequest`](workflow::event_request::EventRequest) and
//! [`SpeakerRequest`](workflow::speaker_request::SpeakerRequest)).
//!
//! # Architecture
//!
//! The crate follows the "Functional Core, Imperative Shell" pattern: every
//! workflow transition is a pure guard-then-mutate function on an entity,
//! returning a [`DomainError`] when a guard fails. No I/O happens here; the
//! store layer executes decided transitions atomically, and the web layer
//! translates [`DomainError`] values into HTTP responses.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod feedback;
pub mod pagination;
pub mod role;
pub mod school;
pub mod types;
pub mod user;
pub mod workflow;

pub use error::{DomainError, Result};
pub use event::{Event, EventRegistration, EventSpeaker, EventStatus, SpeakerSlotStatus};
pub use feedback::Feedback;
pub use pagination::{Page, Paginated};
pub use role::{Capability, Role};
pub use school::School;
pub use types::{Capacity, EventId, EventRequestId, FeedbackId, SchoolId, SpeakerRequestId, UserId};
pub use user::User;
pub use workflow::event_request::{EventRequest, EventRequestStatus, ReviewDecision};
pub use workflow::speaker_request::{SpeakerRequest, SpeakerRequestStatus, SpeakerReviewDecision};
