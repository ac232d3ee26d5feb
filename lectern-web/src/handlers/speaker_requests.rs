//! Speaker-application workflow endpoints.

use crate::error::AppError;
use crate::extractors::Principal;
use crate::handlers::MessageResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use lectern_core::workflow::speaker_request::{Application, ApplicationPatch};
use lectern_core::{
    EventId, Paginated, Role, SpeakerRequest, SpeakerRequestId, SpeakerRequestStatus,
    SpeakerReviewDecision,
};
use lectern_store::{EventStore, SpeakerRequestFilter, SpeakerRequestStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Projection of a speaker application.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerRequestDto {
    /// Application id
    pub id: Uuid,
    /// The target event
    pub event_id: Uuid,
    /// The applying speaker
    pub speaker_id: Uuid,
    /// Talk topic
    pub topic: String,
    /// Speaker bio
    pub bio: Option<String>,
    /// Talk length in minutes
    pub duration_minutes: u32,
    /// Workflow status
    pub status: SpeakerRequestStatus,
    /// Reviewer's note
    pub review_note: Option<String>,
    /// Submission timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl SpeakerRequestDto {
    /// Project a speaker application.
    #[must_use]
    pub fn from_request(request: &SpeakerRequest) -> Self {
        Self {
            id: *request.id.as_uuid(),
            event_id: *request.event_id.as_uuid(),
            speaker_id: *request.speaker_id.as_uuid(),
            topic: request.application.topic.clone(),
            bio: request.application.bio.clone(),
            duration_minutes: request.application.duration_minutes,
            status: request.status,
            review_note: request.review_note.clone(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Response after a mutation, `{ message, speakerRequest }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerRequestResponse {
    /// Outcome message
    pub message: String,
    /// The affected application
    pub speaker_request: SpeakerRequestDto,
}

/// Query parameters for listing applications.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApplicationsQuery {
    /// 1-indexed page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Filter by target event
    pub event: Option<Uuid>,
    /// Filter by status
    pub status: Option<SpeakerRequestStatus>,
}

/// List applications in the caller's scope.
///
/// Speakers see their own applications, school administrators see
/// applications against events they organize, platform administrators see
/// everything.
pub async fn list_applications(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Paginated<SpeakerRequestDto>>, AppError> {
    let mut filter = SpeakerRequestFilter {
        event: query.event.map(EventId::from_uuid),
        status: query.status,
        ..SpeakerRequestFilter::default()
    };
    match principal.user.role {
        Role::SuperAdmin => {}
        Role::Speaker => filter.speaker = Some(principal.user.id),
        Role::SchoolAdmin => filter.organizer = Some(principal.user.id),
        Role::Student => {
            return Err(AppError::forbidden(
                "You do not have permission to view speaker applications",
            ))
        }
    }

    let page = lectern_core::Page::new(query.page, query.limit);
    let requests = state
        .speaker_requests
        .list_applications(filter, page)
        .await?;
    Ok(Json(requests.map(|r| SpeakerRequestDto::from_request(&r))))
}

/// Request body for submitting an application.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationBody {
    /// The target event
    pub event_id: Uuid,
    /// Talk topic
    pub topic: String,
    /// Speaker bio
    pub bio: Option<String>,
    /// Talk length in minutes
    pub duration_minutes: u32,
}

/// Apply to present at a published event.
pub async fn submit_application(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<SubmitApplicationBody>,
) -> Result<(StatusCode, Json<SpeakerRequestResponse>), AppError> {
    let request = state
        .speaker_requests
        .submit_application(
            SpeakerRequestId::new(),
            EventId::from_uuid(body.event_id),
            &principal.user,
            Application {
                topic: body.topic,
                bio: body.bio,
                duration_minutes: body.duration_minutes,
            },
            Utc::now(),
        )
        .await?;

    metrics::counter!("lectern_speaker_requests_submitted_total").increment(1);
    tracing::info!(request_id = %request.id, event = %request.event_id, "Speaker application submitted");

    Ok((
        StatusCode::CREATED,
        Json(SpeakerRequestResponse {
            message: "Speaker application submitted successfully".to_string(),
            speaker_request: SpeakerRequestDto::from_request(&request),
        }),
    ))
}

/// Get one application. Applicant, event organizer, or administrator.
pub async fn get_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<SpeakerRequestDto>, AppError> {
    let request = state
        .speaker_requests
        .application(SpeakerRequestId::from_uuid(id))
        .await?;

    let allowed = principal.is_super_admin()
        || request.speaker_id == principal.user.id
        || state
            .events
            .event(request.event_id)
            .await
            .is_ok_and(|e| e.organizer == principal.user.id);
    if !allowed {
        return Err(AppError::forbidden(
            "You do not have permission to view this application",
        ));
    }
    Ok(Json(SpeakerRequestDto::from_request(&request)))
}

/// Request body for editing an application; `None` fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditApplicationBody {
    /// New topic
    pub topic: Option<String>,
    /// New bio
    pub bio: Option<String>,
    /// New duration in minutes
    pub duration_minutes: Option<u32>,
}

/// Edit an application. Applicant only; the status returns to `pending`.
pub async fn edit_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<EditApplicationBody>,
) -> Result<Json<SpeakerRequestResponse>, AppError> {
    let patch = ApplicationPatch {
        topic: body.topic,
        bio: body.bio,
        duration_minutes: body.duration_minutes,
    };
    let request = state
        .speaker_requests
        .edit_application(
            SpeakerRequestId::from_uuid(id),
            &principal.user,
            patch,
            Utc::now(),
        )
        .await?;
    Ok(Json(SpeakerRequestResponse {
        message: "Speaker application updated successfully".to_string(),
        speaker_request: SpeakerRequestDto::from_request(&request),
    }))
}

/// Review body: the target status and an optional note.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewApplicationBody {
    /// Target status: `approved`, `rejected`, or `waitlisted`
    pub status: String,
    /// Note for the applicant
    pub review_note: Option<String>,
}

/// Review an application. Event organizer or platform administrator.
///
/// Approval re-checks the event's speaker ceiling and appends the speaker
/// slot in one atomic store operation.
pub async fn review_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewApplicationBody>,
) -> Result<Json<SpeakerRequestResponse>, AppError> {
    let decision = SpeakerReviewDecision::parse(&body.status)?;
    let request = state
        .speaker_requests
        .review_application(
            SpeakerRequestId::from_uuid(id),
            &principal.user,
            decision,
            body.review_note,
            Utc::now(),
        )
        .await?;

    metrics::counter!("lectern_speaker_requests_reviewed_total", "status" => request.status.as_str())
        .increment(1);
    tracing::info!(request_id = %request.id, status = %request.status, "Speaker application reviewed");

    Ok(Json(SpeakerRequestResponse {
        message: "Speaker application reviewed successfully".to_string(),
        speaker_request: SpeakerRequestDto::from_request(&request),
    }))
}

/// Withdraw an application. Applicant or platform administrator; never
/// once approved.
pub async fn delete_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .speaker_requests
        .delete_application(SpeakerRequestId::from_uuid(id), &principal.user)
        .await?;
    Ok(Json(MessageResponse::new("Speaker application withdrawn")))
}
