//! Store traits and their supporting types.
//!
//! Each trait abstracts over one concern's database operations; the web
//! layer holds them as `Arc<dyn ...>` so the PostgreSQL and in-memory
//! implementations are interchangeable.

mod events;
mod feedback;
mod reports;
mod requests;
mod schools;
mod sessions;
mod users;

pub use events::{EventFilter, EventStore};
pub use feedback::{FeedbackStats, FeedbackStore};
pub use reports::{PlatformStats, ReportStore, SchoolEventCount, StatusBreakdown};
pub use requests::{EventRequestFilter, EventRequestStore, SpeakerRequestFilter, SpeakerRequestStore};
pub use schools::SchoolStore;
pub use sessions::{LoginCode, Session, SessionStore};
pub use users::{UserFilter, UserStore};
