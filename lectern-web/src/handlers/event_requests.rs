//! Event-proposal workflow endpoints.

use crate::error::AppError;
use crate::extractors::Principal;
use crate::handlers::events::EventDto;
use crate::handlers::MessageResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use lectern_core::workflow::event_request::{Proposal, ProposalPatch};
use lectern_core::{
    Capacity, EventId, EventRequest, EventRequestId, EventRequestStatus, Paginated, ReviewDecision,
    Role,
};
use lectern_store::{EventRequestFilter, EventRequestStore, SchoolStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Projection of an event proposal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestDto {
    /// Request id
    pub id: Uuid,
    /// The school the event would belong to
    pub school_id: Uuid,
    /// The proposing school administrator
    pub requested_by: Uuid,
    /// Proposed title
    pub title: String,
    /// Proposed description
    pub description: String,
    /// Proposed date
    pub date: DateTime<Utc>,
    /// Proposed location
    pub location: String,
    /// Expected attendee ceiling
    pub expected_capacity: u32,
    /// Proposed price in cents
    pub price_cents: i64,
    /// Proposed speaker ceiling
    pub max_speakers: u32,
    /// Free-text requirements
    pub requirements: Option<String>,
    /// Why the school wants this event
    pub justification: Option<String>,
    /// Workflow status
    pub status: EventRequestStatus,
    /// Reviewer's note
    pub review_note: Option<String>,
    /// The materialized event, once approved
    pub approved_event: Option<Uuid>,
    /// Submission timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl EventRequestDto {
    /// Project an event request.
    #[must_use]
    pub fn from_request(request: &EventRequest) -> Self {
        Self {
            id: *request.id.as_uuid(),
            school_id: *request.school_id.as_uuid(),
            requested_by: *request.requested_by.as_uuid(),
            title: request.proposal.title.clone(),
            description: request.proposal.description.clone(),
            date: request.proposal.date,
            location: request.proposal.location.clone(),
            expected_capacity: request.proposal.expected_capacity.value(),
            price_cents: request.proposal.price_cents,
            max_speakers: request.proposal.max_speakers,
            requirements: request.proposal.requirements.clone(),
            justification: request.proposal.justification.clone(),
            status: request.status,
            review_note: request.review_note.clone(),
            approved_event: request.approved_event.map(|e| *e.as_uuid()),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Response after a mutation, `{ message, eventRequest }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestResponse {
    /// Outcome message
    pub message: String,
    /// The affected request
    pub event_request: EventRequestDto,
}

/// Query parameters for listing proposals.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    /// 1-indexed page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Filter by status
    pub status: Option<EventRequestStatus>,
}

/// List proposals in the caller's scope.
///
/// A platform administrator sees every request; a school administrator
/// sees their school's. Other roles have no business here.
pub async fn list_requests(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Paginated<EventRequestDto>>, AppError> {
    let mut filter = EventRequestFilter {
        status: query.status,
        ..EventRequestFilter::default()
    };
    match principal.user.role {
        Role::SuperAdmin => {}
        Role::SchoolAdmin => {
            let school = state
                .schools
                .school_for_admin(principal.user.id)
                .await?
                .ok_or_else(|| AppError::forbidden("You are not associated with any school"))?;
            filter.school = Some(school.id);
        }
        _ => {
            return Err(AppError::forbidden(
                "You do not have permission to view event requests",
            ))
        }
    }

    let page = lectern_core::Page::new(query.page, query.limit);
    let requests = state.event_requests.list_requests(filter, page).await?;
    Ok(Json(requests.map(|r| EventRequestDto::from_request(&r))))
}

/// Request body for submitting a proposal.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    /// Proposed title
    pub title: String,
    /// Proposed description
    pub description: String,
    /// Proposed date
    pub date: DateTime<Utc>,
    /// Proposed location
    pub location: String,
    /// Expected attendee ceiling
    pub expected_capacity: u32,
    /// Proposed price in cents; defaults to free
    #[serde(default)]
    pub price_cents: i64,
    /// Proposed speaker ceiling
    #[serde(default)]
    pub max_speakers: u32,
    /// Free-text requirements
    pub requirements: Option<String>,
    /// Why the school wants this event
    pub justification: Option<String>,
}

/// Submit an event proposal on behalf of the caller's school.
pub async fn submit_request(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<EventRequestResponse>), AppError> {
    let proposal = Proposal {
        title: body.title,
        description: body.description,
        date: body.date,
        location: body.location,
        expected_capacity: Capacity::new(body.expected_capacity),
        price_cents: body.price_cents,
        max_speakers: body.max_speakers,
        requirements: body.requirements,
        justification: body.justification,
    };
    let request = state
        .event_requests
        .submit_request(EventRequestId::new(), &principal.user, proposal, Utc::now())
        .await?;

    metrics::counter!("lectern_event_requests_submitted_total").increment(1);
    tracing::info!(request_id = %request.id, school = %request.school_id, "Event request submitted");

    Ok((
        StatusCode::CREATED,
        Json(EventRequestResponse {
            message: "Event request submitted successfully".to_string(),
            event_request: EventRequestDto::from_request(&request),
        }),
    ))
}

/// Get one proposal. Owner, fellow school admin, or platform administrator.
pub async fn get_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<EventRequestDto>, AppError> {
    let request = state
        .event_requests
        .request(EventRequestId::from_uuid(id))
        .await?;

    let allowed = principal.is_super_admin()
        || request.requested_by == principal.user.id
        || state
            .schools
            .school(request.school_id)
            .await
            .is_ok_and(|s| s.is_administered_by(principal.user.id));
    if !allowed {
        return Err(AppError::forbidden(
            "You do not have permission to view this event request",
        ));
    }
    Ok(Json(EventRequestDto::from_request(&request)))
}

/// Request body for editing a proposal; `None` fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequestBody {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New date
    pub date: Option<DateTime<Utc>>,
    /// New location
    pub location: Option<String>,
    /// New attendee ceiling
    pub expected_capacity: Option<u32>,
    /// New price in cents
    pub price_cents: Option<i64>,
    /// New speaker ceiling
    pub max_speakers: Option<u32>,
    /// New requirements
    pub requirements: Option<String>,
    /// New justification
    pub justification: Option<String>,
}

/// Edit a proposal. Owner only; the status returns to `pending`.
pub async fn edit_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<EditRequestBody>,
) -> Result<Json<EventRequestResponse>, AppError> {
    let patch = ProposalPatch {
        title: body.title,
        description: body.description,
        date: body.date,
        location: body.location,
        expected_capacity: body.expected_capacity.map(Capacity::new),
        price_cents: body.price_cents,
        max_speakers: body.max_speakers,
        requirements: body.requirements,
        justification: body.justification,
    };
    let request = state
        .event_requests
        .edit_request(EventRequestId::from_uuid(id), &principal.user, patch, Utc::now())
        .await?;
    Ok(Json(EventRequestResponse {
        message: "Event request updated successfully".to_string(),
        event_request: EventRequestDto::from_request(&request),
    }))
}

/// Review body: the target status and an optional note.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestBody {
    /// Target status: `approved`, `rejected`, or `needs_revision`
    pub status: String,
    /// Note for the requesting school
    pub review_note: Option<String>,
}

/// Review response; carries the materialized event on approval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestResponse {
    /// Outcome message
    pub message: String,
    /// The reviewed request
    pub event_request: EventRequestDto,
    /// The materialized event, on approval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventDto>,
}

/// Review a proposal. Platform administrator only.
///
/// Approval materializes the event and links it to the request in one
/// atomic store operation.
pub async fn review_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewRequestBody>,
) -> Result<Json<ReviewRequestResponse>, AppError> {
    let decision = ReviewDecision::parse(&body.status)?;
    let (request, event) = state
        .event_requests
        .review_request(
            EventRequestId::from_uuid(id),
            &principal.user,
            decision,
            body.review_note,
            EventId::new(),
            Utc::now(),
        )
        .await?;

    metrics::counter!("lectern_event_requests_reviewed_total", "status" => request.status.as_str())
        .increment(1);
    tracing::info!(request_id = %request.id, status = %request.status, "Event request reviewed");

    let message = match decision {
        ReviewDecision::Approve => "Event request approved",
        ReviewDecision::Reject => "Event request rejected",
        ReviewDecision::RequestRevision => "Event request sent back for revision",
    };
    Ok(Json(ReviewRequestResponse {
        message: message.to_string(),
        event_request: EventRequestDto::from_request(&request),
        event: event.as_ref().map(EventDto::from_event),
    }))
}

/// Delete a proposal. Owner or platform administrator; never once approved.
pub async fn delete_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .event_requests
        .delete_request(EventRequestId::from_uuid(id), &principal.user)
        .await?;
    Ok(Json(MessageResponse::new("Event request deleted")))
}
