//! School (tenant) endpoints.

use crate::error::AppError;
use crate::extractors::{Principal, RequireSuperAdmin};
use crate::handlers::auth::UserDto;
use crate::handlers::events::EventDto;
use crate::handlers::{MessageResponse, PageQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use lectern_core::{
    EventStatus, Paginated, Role, School, SchoolId, User, UserId,
};
use lectern_store::{EventFilter, EventStore, SchoolStore, UserStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public projection of a school.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDto {
    /// School id
    pub id: Uuid,
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Primary administrator
    pub admin: Uuid,
    /// Additional administrators
    pub additional_admins: Vec<Uuid>,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl SchoolDto {
    /// Project a school entity.
    #[must_use]
    pub fn from_school(school: &School) -> Self {
        Self {
            id: *school.id.as_uuid(),
            name: school.name.clone(),
            description: school.description.clone(),
            admin: *school.admin.as_uuid(),
            additional_admins: school
                .additional_admins
                .iter()
                .map(|a| *a.as_uuid())
                .collect(),
            created_at: school.created_at,
        }
    }
}

/// Response after a mutation, `{ message, school }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolResponse {
    /// Outcome message
    pub message: String,
    /// The affected school
    pub school: SchoolDto,
}

/// List schools.
pub async fn list_schools(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<SchoolDto>>, AppError> {
    let schools = state.schools.list_schools(query.to_page()).await?;
    Ok(Json(schools.map(|s| SchoolDto::from_school(&s))))
}

/// Get one school.
pub async fn get_school(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SchoolDto>, AppError> {
    let school = state.schools.school(SchoolId::from_uuid(id)).await?;
    Ok(Json(SchoolDto::from_school(&school)))
}

/// Request to register a school.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    /// School name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// The account that becomes the primary administrator; must already
    /// hold the `school_admin` role
    pub admin_id: Uuid,
}

/// Register a school. Platform administrator only.
pub async fn create_school(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
    Json(request): Json<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<SchoolResponse>), AppError> {
    let admin_id = UserId::from_uuid(request.admin_id);
    let mut admin_user = state.users.user(admin_id).await?;
    if admin_user.role != Role::SchoolAdmin {
        return Err(AppError::bad_request(
            "The school administrator must hold the school_admin role",
        ));
    }
    if state.schools.school_for_admin(admin_id).await?.is_some() {
        return Err(AppError::bad_request(
            "This user already administers a school",
        ));
    }

    let now = Utc::now();
    let school = School::new(SchoolId::new(), request.name, request.description, admin_id, now)?;
    state.schools.create_school(&school).await?;

    admin_user.school_id = Some(school.id);
    admin_user.updated_at = now;
    state.users.update_user(&admin_user).await?;

    tracing::info!(school_id = %school.id, admin = %admin_id, "School registered");

    Ok((
        StatusCode::CREATED,
        Json(SchoolResponse {
            message: "School created successfully".to_string(),
            school: SchoolDto::from_school(&school),
        }),
    ))
}

/// Request to update a school; `None` fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolRequest {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// Replacement list of additional administrators
    pub additional_admins: Option<Vec<Uuid>>,
}

/// Update a school. Its administrators or a platform administrator.
pub async fn update_school(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSchoolRequest>,
) -> Result<Json<SchoolResponse>, AppError> {
    let mut school = state.schools.school(SchoolId::from_uuid(id)).await?;
    if !principal.is_super_admin() && !school.is_administered_by(principal.user.id) {
        return Err(AppError::forbidden(
            "You can only update your own school",
        ));
    }

    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(AppError::bad_request("School name is required"));
        }
        school.name = name;
    }
    if let Some(description) = request.description {
        school.description = Some(description);
    }
    if let Some(additional) = request.additional_admins {
        let mut admins = Vec::with_capacity(additional.len());
        for raw in additional {
            let user_id = UserId::from_uuid(raw);
            let user = state.users.user(user_id).await?;
            if user.role != Role::SchoolAdmin {
                return Err(AppError::bad_request(
                    "Additional administrators must hold the school_admin role",
                ));
            }
            admins.push(user_id);
        }
        school.additional_admins = admins;
    }
    school.updated_at = Utc::now();
    state.schools.update_school(&school).await?;

    Ok(Json(SchoolResponse {
        message: "School updated successfully".to_string(),
        school: SchoolDto::from_school(&school),
    }))
}

/// Delete a school. Platform administrator only; refused while the school
/// still hosts events.
pub async fn delete_school(
    State(state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.schools.delete_school(SchoolId::from_uuid(id)).await?;
    Ok(Json(MessageResponse::new("School deleted successfully")))
}

/// Query parameters for a school's event listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolEventsQuery {
    /// 1-indexed page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Filter by lifecycle status
    pub status: Option<EventStatus>,
}

/// List a school's events.
pub async fn school_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SchoolEventsQuery>,
) -> Result<Json<Paginated<EventDto>>, AppError> {
    let school = state.schools.school(SchoolId::from_uuid(id)).await?;
    let filter = EventFilter {
        status: query.status,
        school: Some(school.id),
        organizer: None,
        public_only: false,
    };
    let page = lectern_core::Page::new(query.page, query.limit);
    let events = state.events.list_events(filter, page).await?;
    Ok(Json(events.map(|e| EventDto::from_event(&e))))
}

/// List a school's students. Its administrators or a platform
/// administrator.
pub async fn school_students(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<UserDto>>, AppError> {
    let school = state.schools.school(SchoolId::from_uuid(id)).await?;
    if !principal.is_super_admin() && !school.is_administered_by(principal.user.id) {
        return Err(AppError::forbidden(
            "You can only view students of your own school",
        ));
    }
    let students = state
        .schools
        .school_students(school.id, query.to_page())
        .await?;
    Ok(Json(students.map(|u: User| UserDto::from_user(&u))))
}
