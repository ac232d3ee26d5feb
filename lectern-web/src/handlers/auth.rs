//! Authentication endpoints.
//!
//! Passwordless flow: an account requests a one-time login code, the code
//! arrives by mail (or in the response when the testing flag is on), and
//! is exchanged for an opaque bearer session token validated on every
//! request. Password hashing never enters the picture.

use crate::error::AppError;
use crate::extractors::Principal;
use crate::handlers::MessageResponse;
use crate::state::AppState;
use crate::tokens;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use crate::mailer::Mailer;
use lectern_core::{Role, SchoolId, User, UserId};
use lectern_store::{LoginCode, SchoolStore, Session, SessionStore, UserStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public projection of a user account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// Account id
    pub id: Uuid,
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// School membership, if any
    pub school_id: Option<Uuid>,
    /// Whether the account can log in
    pub active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl UserDto {
    /// Project a user entity.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            school_id: user.school_id.map(|s| *s.as_uuid()),
            active: user.active,
            created_at: user.created_at,
        }
    }
}

/// Request to create an account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Requested role; only self-service roles are accepted
    pub role: Role,
    /// School to join, for students
    pub school_id: Option<Uuid>,
}

/// Response after registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// Outcome message
    pub message: String,
    /// The created account
    pub user: UserDto,
}

/// Create a student or speaker account.
///
/// Administrator accounts are provisioned through `/api/admin/users`, so
/// self-service registration only accepts the two public roles.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if !matches!(request.role, Role::Student | Role::Speaker) {
        return Err(AppError::bad_request("Role must be student or speaker"));
    }

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

    metrics::counter!("lectern_registrations_total").increment(1);
    tracing::info!(user_id = %user.id, role = %user.role, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created successfully".to_string(),
            user: UserDto::from_user(&user),
        }),
    ))
}

/// Request a login code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account email
    pub email: String,
}

/// Response after requesting a login code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Outcome message
    pub message: String,
    /// The login code itself, present only when `expose_login_codes` is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_code: Option<String>,
}

/// Issue a one-time login code to an account's email.
///
/// Responds identically whether or not the account exists, so the
/// endpoint cannot be used to probe for registered emails.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = request.email.trim().to_lowercase();
    let message = "If this email is registered, a login code has been sent".to_string();

    let Ok(user) = state.users.user_by_email(&email).await else {
        return Ok(Json(LoginResponse {
            message,
            login_code: None,
        }));
    };
    if !user.active {
        return Ok(Json(LoginResponse {
            message,
            login_code: None,
        }));
    }

    let code = LoginCode {
        code: tokens::login_code(),
        email: user.email.clone(),
        expires_at: Utc::now() + state.auth.login_code_ttl,
    };
    state.sessions.create_login_code(&code).await?;
    state
        .mailer
        .send_login_code(&user.email, &code.code, code.expires_at)
        .await?;

    Ok(Json(LoginResponse {
        message,
        login_code: state.auth.expose_login_codes.then_some(code.code),
    }))
}

/// Request to redeem a login code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// The one-time code from the login email
    pub code: String,
}

/// Response carrying the issued bearer token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Outcome message
    pub message: String,
    /// The bearer session token
    pub token: String,
    /// The authenticated account
    pub user: UserDto,
}

/// Exchange a login code for a bearer session token.
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    let now = Utc::now();
    let email = state
        .sessions
        .consume_login_code(&request.code, now)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid or expired login code"))?;
    let user = state
        .users
        .user_by_email(&email)
        .await
        .map_err(|_| AppError::unauthorized("Invalid or expired login code"))?;
    if !user.active {
        return Err(AppError::unauthorized("This account has been deactivated"));
    }

    let session = Session {
        token: tokens::session_token(),
        user_id: user.id,
        created_at: now,
        expires_at: now + state.auth.session_ttl,
    };
    state.sessions.create_session(&session).await?;

    metrics::counter!("lectern_logins_total").increment(1);
    tracing::info!(user_id = %user.id, "Session issued");

    Ok(Json(VerifyResponse {
        message: "Logged in successfully".to_string(),
        token: session.token,
        user: UserDto::from_user(&user),
    }))
}

/// Revoke the current session.
pub async fn logout(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<MessageResponse>, AppError> {
    state.sessions.delete_session(&principal.session.token).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// The authenticated account.
pub async fn me(principal: Principal) -> Json<UserDto> {
    Json(UserDto::from_user(&principal.user))
}
