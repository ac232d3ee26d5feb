//! Event endpoints.
//!
//! Public read, role-gated write. Registration and the legacy in-event
//! speaker path live here too; both are capacity-checked atomically by the
//! store.

use crate::error::AppError;
use crate::extractors::Principal;
use crate::handlers::{MessageResponse, PageQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use lectern_core::workflow::speaker_request::Application;
use lectern_core::{
    Capability, Capacity, DomainError, Event, EventId, EventSpeaker, EventStatus, Paginated, Role,
    SchoolId, SpeakerSlotStatus, UserId,
};
use lectern_store::{EventFilter, EventStore, SchoolStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public projection of an event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    /// Event id
    pub id: Uuid,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Hosting school
    pub host_school: Uuid,
    /// Organizing user
    pub organizer: Uuid,
    /// When it takes place
    pub date: DateTime<Utc>,
    /// Where it takes place
    pub location: String,
    /// Attendee ceiling
    pub capacity: u32,
    /// Ticket price in cents
    pub price_cents: i64,
    /// Speaker-slot ceiling
    pub max_speakers: u32,
    /// Free-text requirements
    pub requirements: Option<String>,
    /// Lifecycle status
    pub status: EventStatus,
    /// Whether the event is listed publicly
    pub is_public: bool,
    /// Mean rating, one decimal
    pub average_rating: f64,
    /// Number of ratings
    pub total_ratings: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl EventDto {
    /// Project an event entity.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            title: event.title.clone(),
            description: event.description.clone(),
            host_school: *event.host_school.as_uuid(),
            organizer: *event.organizer.as_uuid(),
            date: event.date,
            location: event.location.clone(),
            capacity: event.capacity.value(),
            price_cents: event.price_cents,
            max_speakers: event.max_speakers,
            requirements: event.requirements.clone(),
            status: event.status,
            is_public: event.is_public,
            average_rating: event.average_rating,
            total_ratings: event.total_ratings,
            created_at: event.created_at,
        }
    }
}

/// Projection of a speaker slot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSlotDto {
    /// The presenting user
    pub user_id: Uuid,
    /// Talk topic
    pub topic: String,
    /// Talk length in minutes
    pub duration_minutes: u32,
    /// Slot status
    pub status: SpeakerSlotStatus,
    /// When the slot was created
    pub added_at: DateTime<Utc>,
}

impl SpeakerSlotDto {
    fn from_slot(slot: &EventSpeaker) -> Self {
        Self {
            user_id: *slot.user_id.as_uuid(),
            topic: slot.topic.clone(),
            duration_minutes: slot.duration_minutes,
            status: slot.status,
            added_at: slot.added_at,
        }
    }
}

/// Query parameters for the public event catalog.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    /// 1-indexed page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Filter by lifecycle status
    pub status: Option<EventStatus>,
    /// Filter by hosting school
    pub school: Option<Uuid>,
}

/// List publicly visible events, soonest first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Paginated<EventDto>>, AppError> {
    let filter = EventFilter {
        status: query.status,
        school: query.school.map(SchoolId::from_uuid),
        organizer: None,
        public_only: true,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .to_page();
    let events = state.events.list_events(filter, page).await?;
    Ok(Json(events.map(|e| EventDto::from_event(&e))))
}

/// Get one event.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventDto>, AppError> {
    let event = state.events.event(EventId::from_uuid(id)).await?;
    Ok(Json(EventDto::from_event(&event)))
}

/// Request to create an event directly (outside the proposal workflow).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// When it takes place
    pub date: DateTime<Utc>,
    /// Where it takes place
    pub location: String,
    /// Attendee ceiling
    pub capacity: u32,
    /// Ticket price in cents; defaults to free
    #[serde(default)]
    pub price_cents: i64,
    /// Speaker-slot ceiling
    #[serde(default)]
    pub max_speakers: u32,
    /// Free-text requirements
    pub requirements: Option<String>,
    /// Whether to list publicly; defaults to true
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Lifecycle status; defaults to draft
    pub status: Option<EventStatus>,
    /// Hosting school. Required for platform administrators, ignored for
    /// school administrators (their own school always hosts)
    pub school_id: Option<Uuid>,
}

const fn default_true() -> bool {
    true
}

/// Response after a mutation, `{ message, event }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// Outcome message
    pub message: String,
    /// The affected event
    pub event: EventDto,
}

/// Create an event directly.
///
/// School administrators create events hosted by their own school; a
/// platform administrator must name the hosting school.
pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    principal.user.role.require(Capability::ManageEvents)?;

    let host_school = match principal.user.role {
        Role::SuperAdmin => {
            let id = request
                .school_id
                .ok_or_else(|| AppError::bad_request("A hosting school is required"))?;
            state.schools.school(SchoolId::from_uuid(id)).await?.id
        }
        _ => state
            .schools
            .school_for_admin(principal.user.id)
            .await?
            .ok_or_else(|| {
                AppError::from(DomainError::validation(
                    "You are not associated with any school",
                ))
            })?
            .id,
    };

    if request.title.trim().is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    if request.capacity == 0 {
        return Err(AppError::bad_request("Capacity must be at least 1"));
    }
    if request.price_cents < 0 {
        return Err(AppError::bad_request("Price cannot be negative"));
    }

    let now = Utc::now();
    let event = Event {
        id: EventId::new(),
        title: request.title,
        description: request.description,
        host_school,
        organizer: principal.user.id,
        date: request.date,
        location: request.location,
        capacity: Capacity::new(request.capacity),
        price_cents: request.price_cents,
        max_speakers: request.max_speakers,
        requirements: request.requirements,
        status: request.status.unwrap_or(EventStatus::Draft),
        is_public: request.is_public,
        average_rating: 0.0,
        total_ratings: 0,
        created_at: now,
        updated_at: now,
    };
    state.events.create_event(&event).await?;

    metrics::counter!("lectern_events_created_total").increment(1);
    tracing::info!(event_id = %event.id, organizer = %event.organizer, "Event created");

    Ok((
        StatusCode::CREATED,
        Json(EventResponse {
            message: "Event created successfully".to_string(),
            event: EventDto::from_event(&event),
        }),
    ))
}

/// Request to update an event; `None` fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New date
    pub date: Option<DateTime<Utc>>,
    /// New location
    pub location: Option<String>,
    /// New attendee ceiling
    pub capacity: Option<u32>,
    /// New price in cents
    pub price_cents: Option<i64>,
    /// New speaker ceiling
    pub max_speakers: Option<u32>,
    /// New requirements
    pub requirements: Option<String>,
    /// New lifecycle status
    pub status: Option<EventStatus>,
    /// New visibility
    pub is_public: Option<bool>,
}

/// Update an event. Organizer or platform administrator only.
pub async fn update_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    let mut event = state.events.event(EventId::from_uuid(id)).await?;
    event.authorize_manage(&principal.user)?;

    if let Some(title) = request.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("Title is required"));
        }
        event.title = title;
    }
    if let Some(description) = request.description {
        event.description = description;
    }
    if let Some(date) = request.date {
        event.date = date;
    }
    if let Some(location) = request.location {
        event.location = location;
    }
    if let Some(capacity) = request.capacity {
        if capacity == 0 {
            return Err(AppError::bad_request("Capacity must be at least 1"));
        }
        event.capacity = Capacity::new(capacity);
    }
    if let Some(price) = request.price_cents {
        if price < 0 {
            return Err(AppError::bad_request("Price cannot be negative"));
        }
        event.price_cents = price;
    }
    if let Some(max_speakers) = request.max_speakers {
        event.max_speakers = max_speakers;
    }
    if let Some(requirements) = request.requirements {
        event.requirements = Some(requirements);
    }
    if let Some(status) = request.status {
        event.status = status;
    }
    if let Some(is_public) = request.is_public {
        event.is_public = is_public;
    }
    event.updated_at = Utc::now();
    state.events.update_event(&event).await?;

    Ok(Json(EventResponse {
        message: "Event updated successfully".to_string(),
        event: EventDto::from_event(&event),
    }))
}

/// Delete an event. Organizer or platform administrator only.
pub async fn delete_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let event = state.events.event(EventId::from_uuid(id)).await?;
    event.authorize_manage(&principal.user)?;
    state.events.delete_event(event.id).await?;
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}

/// Register the authenticated student for an event.
pub async fn register(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    principal.user.role.require(Capability::RegisterForEvent)?;
    state
        .events
        .register_attendee(EventId::from_uuid(id), principal.user.id, Utc::now())
        .await?;

    metrics::counter!("lectern_registrations_confirmed_total").increment(1);

    Ok(Json(MessageResponse::new("Registered for event successfully")))
}

/// Cancel the authenticated student's registration.
pub async fn unregister(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    principal.user.role.require(Capability::RegisterForEvent)?;
    state
        .events
        .unregister_attendee(EventId::from_uuid(id), principal.user.id)
        .await?;
    Ok(Json(MessageResponse::new("Registration cancelled")))
}

/// List an event's speaker slots.
pub async fn list_speakers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SpeakerSlotDto>>, AppError> {
    let slots = state.events.speakers(EventId::from_uuid(id)).await?;
    Ok(Json(slots.iter().map(SpeakerSlotDto::from_slot).collect()))
}

/// The legacy in-event speaker application body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySpeakerRequest {
    /// Talk topic
    pub topic: String,
    /// Speaker bio
    pub bio: Option<String>,
    /// Talk length in minutes
    pub duration_minutes: u32,
}

/// Response after a speaker-slot mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSlotResponse {
    /// Outcome message
    pub message: String,
    /// The affected slot
    pub speaker: SpeakerSlotDto,
}

/// Apply to speak through the legacy in-event path.
pub async fn apply_speaker(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplySpeakerRequest>,
) -> Result<(StatusCode, Json<SpeakerSlotResponse>), AppError> {
    let slot = state
        .events
        .apply_speaker_slot(
            EventId::from_uuid(id),
            &principal.user,
            Application {
                topic: request.topic,
                bio: request.bio,
                duration_minutes: request.duration_minutes,
            },
            Utc::now(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SpeakerSlotResponse {
            message: "Speaker application submitted".to_string(),
            speaker: SpeakerSlotDto::from_slot(&slot),
        }),
    ))
}

/// Review body for the legacy speaker path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSpeakerSlotRequest {
    /// Target status: `approved` or `rejected`
    pub status: String,
}

/// Approve or reject a speaker slot through the legacy in-event path.
pub async fn review_speaker_slot(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, speaker_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ReviewSpeakerSlotRequest>,
) -> Result<Json<SpeakerSlotResponse>, AppError> {
    let target: SpeakerSlotStatus = request.status.parse()?;
    let slot = state
        .events
        .review_speaker_slot(
            EventId::from_uuid(id),
            UserId::from_uuid(speaker_id),
            &principal.user,
            target,
        )
        .await?;

    metrics::counter!("lectern_speaker_slots_reviewed_total", "status" => target.as_str())
        .increment(1);

    Ok(Json(SpeakerSlotResponse {
        message: "Speaker application reviewed".to_string(),
        speaker: SpeakerSlotDto::from_slot(&slot),
    }))
}
