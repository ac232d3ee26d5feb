//! Application state shared across all HTTP handlers.

use crate::config::Config;
use crate::mailer::{ConsoleMailer, Mailer};
use chrono::Duration;
use lectern_store::{
    EventRequestStore, EventStore, FeedbackStore, MemoryStore, PgStore, ReportStore, SchoolStore,
    SessionStore, SpeakerRequestStore, UserStore,
};
use std::sync::Arc;

/// Authentication settings carried in the state.
#[derive(Clone, Copy, Debug)]
pub struct AuthSettings {
    /// How long issued sessions stay valid
    pub session_ttl: Duration,
    /// How long login codes stay redeemable
    pub login_code_ttl: Duration,
    /// Include login codes in API responses (testing only)
    pub expose_login_codes: bool,
}

/// Application state shared across all HTTP handlers.
///
/// Holds every store behind a trait object, so the PostgreSQL and
/// in-memory backends are interchangeable; cloned (cheaply via `Arc`) for
/// each request.
#[derive(Clone)]
pub struct AppState {
    /// User accounts
    pub users: Arc<dyn UserStore>,
    /// Schools (tenants)
    pub schools: Arc<dyn SchoolStore>,
    /// Events and their child records
    pub events: Arc<dyn EventStore>,
    /// The event-proposal workflow
    pub event_requests: Arc<dyn EventRequestStore>,
    /// The speaker-application workflow
    pub speaker_requests: Arc<dyn SpeakerRequestStore>,
    /// Feedback and rating rollups
    pub feedback: Arc<dyn FeedbackStore>,
    /// Bearer sessions and login codes
    pub sessions: Arc<dyn SessionStore>,
    /// Dashboard rollups
    pub reports: Arc<dyn ReportStore>,
    /// Outbound mail
    pub mailer: Arc<dyn Mailer>,
    /// Authentication settings
    pub auth: AuthSettings,
}

impl AppState {
    /// Build state on the in-memory store.
    #[must_use]
    pub fn with_memory_store(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::assemble(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            config,
        )
    }

    /// Build state on a connected PostgreSQL store.
    #[must_use]
    pub fn with_pg_store(store: PgStore, config: &Config) -> Self {
        let store = Arc::new(store);
        Self::assemble(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            config,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        users: Arc<dyn UserStore>,
        schools: Arc<dyn SchoolStore>,
        events: Arc<dyn EventStore>,
        event_requests: Arc<dyn EventRequestStore>,
        speaker_requests: Arc<dyn SpeakerRequestStore>,
        feedback: Arc<dyn FeedbackStore>,
        sessions: Arc<dyn SessionStore>,
        reports: Arc<dyn ReportStore>,
        config: &Config,
    ) -> Self {
        Self {
            users,
            schools,
            events,
            event_requests,
            speaker_requests,
            feedback,
            sessions,
            reports,
            mailer: Arc::new(ConsoleMailer::new()),
            auth: AuthSettings {
                session_ttl: Duration::seconds(
                    i64::try_from(config.auth.session_ttl).unwrap_or(604_800),
                ),
                login_code_ttl: Duration::seconds(
                    i64::try_from(config.auth.login_code_ttl).unwrap_or(900),
                ),
                expose_login_codes: config.auth.expose_login_codes,
            },
        }
    }
}
