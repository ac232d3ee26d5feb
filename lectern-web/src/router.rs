//! Router configuration.
//!
//! Builds the complete Axum router: health checks at the root, everything
//! else under the `/api` prefix, with tracing, request-id, and CORS layers
//! applied to the lot.

use crate::handlers::{
    admin, auth, event_requests, events, feedback, health, schools, speaker_requests,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    let event_routes = Router::new()
        .route("/events", get(events::list_events))
        .route("/events", post(events::create_event))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id", put(events::update_event))
        .route("/events/:id", delete(events::delete_event))
        .route("/events/:id/register", post(events::register))
        .route("/events/:id/register", delete(events::unregister))
        .route("/events/:id/speakers", get(events::list_speakers))
        .route("/events/:id/apply-speaker", post(events::apply_speaker))
        .route(
            "/events/:id/speakers/:speakerId",
            put(events::review_speaker_slot),
        );

    let event_request_routes = Router::new()
        .route("/event-requests", get(event_requests::list_requests))
        .route("/event-requests", post(event_requests::submit_request))
        .route("/event-requests/:id", get(event_requests::get_request))
        .route("/event-requests/:id", put(event_requests::edit_request))
        .route(
            "/event-requests/:id/review",
            put(event_requests::review_request),
        )
        .route(
            "/event-requests/:id",
            delete(event_requests::delete_request),
        );

    let speaker_request_routes = Router::new()
        .route(
            "/speaker-requests",
            get(speaker_requests::list_applications),
        )
        .route(
            "/speaker-requests",
            post(speaker_requests::submit_application),
        )
        .route(
            "/speaker-requests/:id",
            get(speaker_requests::get_application),
        )
        .route(
            "/speaker-requests/:id",
            put(speaker_requests::edit_application),
        )
        .route(
            "/speaker-requests/:id/review",
            put(speaker_requests::review_application),
        )
        .route(
            "/speaker-requests/:id",
            delete(speaker_requests::delete_application),
        );

    let school_routes = Router::new()
        .route("/schools", get(schools::list_schools))
        .route("/schools", post(schools::create_school))
        .route("/schools/:id", get(schools::get_school))
        .route("/schools/:id", put(schools::update_school))
        .route("/schools/:id", delete(schools::delete_school))
        .route("/schools/:id/events", get(schools::school_events))
        .route("/schools/:id/students", get(schools::school_students));

    let feedback_routes = Router::new()
        .route("/feedback", get(feedback::list_own_feedback))
        .route("/feedback", post(feedback::submit_feedback))
        .route("/feedback/:id", put(feedback::update_feedback))
        .route("/feedback/:id", delete(feedback::delete_feedback))
        .route("/feedback/event/:id", get(feedback::event_feedback))
        .route(
            "/feedback/stats/event/:id",
            get(feedback::event_feedback_stats),
        );

    let admin_routes = Router::new()
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users", post(admin::create_user))
        .route("/admin/users/:id", put(admin::update_user))
        .route("/admin/users/:id", delete(admin::deactivate_user));

    let api_routes = auth_routes
        .merge(event_routes)
        .merge(event_request_routes)
        .merge(speaker_request_routes)
        .merge(school_routes)
        .merge(feedback_routes)
        .merge(admin_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
