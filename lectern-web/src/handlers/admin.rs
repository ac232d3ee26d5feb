//! Platform-administrator endpoints: the dashboard and account management.

use crate::error::AppError;
use crate::extractors::RequireSuperAdmin;
use crate::handlers::auth::UserDto;
use crate::handlers::MessageResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use lectern_core::{Paginated, Role, SchoolId, User, UserId};
use lectern_store::{
    PlatformStats, ReportStore, SchoolEventCount, SchoolStore, StatusBreakdown, UserFilter,
    UserStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The dashboard payload: headline counts, workflow breakdowns, and the
/// most active schools. Recomputed on every call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Headline counts
    pub stats: PlatformStats,
    /// Event proposals grouped by status
    pub event_requests_by_status: Vec<StatusBreakdown>,
    /// Speaker applications grouped by status
    pub speaker_requests_by_status: Vec<StatusBreakdown>,
    /// Schools ranked by hosted event count
    pub top_schools: Vec<SchoolEventCount>,
}

/// Number of schools shown in the dashboard ranking.
const TOP_SCHOOLS: u32 = 5;

/// The administrator dashboard.
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
) -> Result<Json<DashboardResponse>, AppError> {
    let stats = state.reports.platform_stats(Utc::now()).await?;
    let event_requests_by_status = state.reports.event_request_breakdown().await?;
    let speaker_requests_by_status = state.reports.speaker_request_breakdown().await?;
    let top_schools = state.reports.top_schools(TOP_SCHOOLS).await?;
    Ok(Json(DashboardResponse {
        stats,
        event_requests_by_status,
        speaker_requests_by_status,
        top_schools,
    }))
}

/// Query parameters for the user listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    /// 1-indexed page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Filter by role
    pub role: Option<Role>,
    /// Drop deactivated accounts
    #[serde(default)]
    pub active_only: bool,
}

/// List user accounts.
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Paginated<UserDto>>, AppError> {
    let filter = UserFilter {
        role: query.role,
        school: None,
        active_only: query.active_only,
    };
    let page = lectern_core::Page::new(query.page, query.limit);
    let users = state.users.list_users(filter, page).await?;
    Ok(Json(users.map(|u| UserDto::from_user(&u))))
}

/// Request to provision an account with any role.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Role, including the administrator roles
    pub role: Role,
    /// School membership, if any
    pub school_id: Option<Uuid>,
}

/// Response after an account mutation, `{ message, user }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Outcome message
    pub message: String,
    /// The affected account
    pub user: UserDto,
}

/// Provision an account. Unlike self-service registration, any role is
/// allowed; this is how school and platform administrators are created.
pub async fn create_user(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let mut user = User::new(
        UserId::new(),
        request.email.trim().to_lowercase(),
        request.name.trim(),
        request.role,
        Utc::now(),
    )?;
    if let Some(school_id) = request.school_id {
        let school_id = SchoolId::from_uuid(school_id);
        state.schools.school(school_id).await?;
        user.school_id = Some(school_id);
    }
    state.users.create_user(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account provisioned");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully".to_string(),
            user: UserDto::from_user(&user),
        }),
    ))
}

/// Request to update an account; `None` fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// New display name
    pub name: Option<String>,
    /// New role
    pub role: Option<Role>,
    /// New school membership
    pub school_id: Option<Uuid>,
    /// Activate or deactivate the account
    pub active: Option<bool>,
}

/// Update an account's name, role, school, or active flag.
pub async fn update_user(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut user = state.users.user(UserId::from_uuid(id)).await?;
    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(AppError::bad_request("Name is required"));
        }
        user.name = name;
    }
    if let Some(role) = request.role {
        user.role = role;
    }
    if let Some(school_id) = request.school_id {
        let school_id = SchoolId::from_uuid(school_id);
        state.schools.school(school_id).await?;
        user.school_id = Some(school_id);
    }
    if let Some(active) = request.active {
        user.active = active;
    }
    user.updated_at = Utc::now();
    state.users.update_user(&user).await?;

    Ok(Json(UserResponse {
        message: "User updated successfully".to_string(),
        user: UserDto::from_user(&user),
    }))
}

/// Deactivate an account. Accounts are never hard-deleted: old records
/// keep resolving their author, and the account simply cannot log in.
pub async fn deactivate_user(
    State(state): State<AppState>,
    admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let target = UserId::from_uuid(id);
    if target == admin.user.id {
        return Err(AppError::bad_request(
            "You cannot deactivate your own account",
        ));
    }
    let mut user = state.users.user(target).await?;
    user.active = false;
    user.updated_at = Utc::now();
    state.users.update_user(&user).await?;
    Ok(Json(MessageResponse::new("User deactivated")))
}
