//! Persistence layer for the Lectern event platform.
//!
//! The store traits in [`traits`] expose the workflow transitions as
//! single atomic operations: the store loads the affected rows, runs the
//! pure guards from `lectern-core`, and persists the decided transition in
//! one step. Two implementations are provided:
//!
//! - [`postgres::PgStore`]: `sqlx` on PostgreSQL. Multi-step transitions
//!   (approving a proposal, approving a speaker under the capacity
//!   ceiling) run in one transaction with `SELECT ... FOR UPDATE` on the
//!   parent row, so concurrent reviewers cannot double-approve and
//!   concurrent approvals cannot overrun a ceiling.
//! - [`memory::MemoryStore`]: a full in-memory implementation behind a
//!   single lock with the same observable behavior, used by the HTTP test
//!   suite and local development.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{
    EventFilter, EventRequestFilter, EventRequestStore, EventStore, FeedbackStats, FeedbackStore,
    LoginCode, PlatformStats, ReportStore, SchoolEventCount, SchoolStore, Session, SessionStore,
    SpeakerRequestFilter, SpeakerRequestStore, StatusBreakdown, UserFilter, UserStore,
};
