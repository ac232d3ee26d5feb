//! The approval workflows.
//!
//! Two state machines with cross-entity side effects:
//!
//! - [`event_request`]: a school administrator proposes an event, a platform
//!   administrator reviews it; approval materializes an [`Event`](crate::Event).
//! - [`speaker_request`]: a speaker applies against a published event, the
//!   organizer (or a platform administrator) reviews; approval appends a
//!   speaker slot to the event, subject to its speaker ceiling.
//!
//! Each transition is a pure guard-then-mutate function taking the acting
//! principal explicitly. Side effects that span entities (materializing an
//! event, appending a speaker slot after the capacity re-check) are decided
//! here but executed by the store inside one atomic operation.

pub mod event_request;
pub mod speaker_request;

pub use event_request::{EventRequest, EventRequestStatus, Proposal, ProposalPatch, ReviewDecision};
pub use speaker_request::{
    Application, ApplicationPatch, SpeakerRequest, SpeakerRequestStatus, SpeakerReviewDecision,
};
