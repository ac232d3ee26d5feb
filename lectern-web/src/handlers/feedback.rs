//! Feedback endpoints.

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
use lectern_core::{Capability, EventId, Feedback, FeedbackId, Paginated};
use lectern_store::{FeedbackStats, FeedbackStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Projection of a feedback record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDto {
    /// Feedback id
    pub id: Uuid,
    /// The rated event
    pub event_id: Uuid,
    /// The rating user
    pub user_id: Uuid,
    /// Rating, 1 to 5
    pub rating: u8,
    /// Review text
    pub comment: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl FeedbackDto {
    /// Project a feedback entity.
    #[must_use]
    pub fn from_feedback(feedback: &Feedback) -> Self {
        Self {
            id: *feedback.id.as_uuid(),
            event_id: *feedback.event_id.as_uuid(),
            user_id: *feedback.user_id.as_uuid(),
            rating: feedback.rating,
            comment: feedback.comment.clone(),
            created_at: feedback.created_at,
            updated_at: feedback.updated_at,
        }
    }
}

/// Response after a mutation, `{ message, feedback }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    /// Outcome message
    pub message: String,
    /// The affected record
    pub feedback: FeedbackDto,
}

/// List the authenticated user's own feedback.
pub async fn list_own_feedback(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<FeedbackDto>>, AppError> {
    let feedback = state
        .feedback
        .list_for_user(principal.user.id, query.to_page())
        .await?;
    Ok(Json(feedback.map(|f| FeedbackDto::from_feedback(&f))))
}

/// Request to submit feedback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    /// The rated event
    pub event_id: Uuid,
    /// Rating, 1 to 5
    pub rating: u8,
    /// Review text
    pub comment: Option<String>,
}

/// Rate and review an event. One record per (event, user).
pub async fn submit_feedback(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>), AppError> {
    principal.user.role.require(Capability::LeaveFeedback)?;
    let feedback = state
        .feedback
        .submit_feedback(
            FeedbackId::new(),
            EventId::from_uuid(request.event_id),
            principal.user.id,
            request.rating,
            request.comment,
            Utc::now(),
        )
        .await?;

    metrics::counter!("lectern_feedback_submitted_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            message: "Feedback submitted successfully".to_string(),
            feedback: FeedbackDto::from_feedback(&feedback),
        }),
    ))
}

/// Request to update feedback; `None` fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackRequest {
    /// New rating
    pub rating: Option<u8>,
    /// New review text
    pub comment: Option<String>,
}

/// Update feedback. Author or platform administrator; the event's rating
/// rollup is recomputed in the same operation.
pub async fn update_feedback(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let feedback = state
        .feedback
        .update_feedback(
            FeedbackId::from_uuid(id),
            principal.user.id,
            principal.is_super_admin(),
            request.rating,
            request.comment,
            Utc::now(),
        )
        .await?;
    Ok(Json(FeedbackResponse {
        message: "Feedback updated successfully".to_string(),
        feedback: FeedbackDto::from_feedback(&feedback),
    }))
}

/// Delete feedback. Author or platform administrator.
pub async fn delete_feedback(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .feedback
        .delete_feedback(
            FeedbackId::from_uuid(id),
            principal.user.id,
            principal.is_super_admin(),
        )
        .await?;
    Ok(Json(MessageResponse::new("Feedback deleted successfully")))
}

/// List an event's feedback.
pub async fn event_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<FeedbackDto>>, AppError> {
    let feedback = state
        .feedback
        .list_for_event(EventId::from_uuid(id), query.to_page())
        .await?;
    Ok(Json(feedback.map(|f| FeedbackDto::from_feedback(&f))))
}

/// Rollup statistics for an event's feedback.
pub async fn event_feedback_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackStats>, AppError> {
    let stats = state
        .feedback
        .stats_for_event(EventId::from_uuid(id))
        .await?;
    Ok(Json(stats))
}
