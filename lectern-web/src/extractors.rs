//! Authentication extractors.
//!
//! The principal is resolved once per request by an extractor and passed
//! explicitly into every store call; there is no ambient request context.
//!
//! - [`BearerToken`]: the raw `Authorization: Bearer <token>` value
//! - [`Principal`]: a validated session plus the account behind it
//! - [`RequireSuperAdmin`]: a principal whose role is `super_admin`

use crate::error::AppError;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use lectern_core::{Capability, Role, User};
use lectern_store::{Session, SessionStore, UserStore};

/// Bearer token extracted from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .to_string();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token))
    }
}

/// The authenticated principal: a validated session and its account.
///
/// Use this as a handler parameter to require authentication. Deactivated
/// accounts fail validation even while their sessions are unexpired.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The authenticated account
    pub user: User,
    /// The validated session
    pub session: Session,
}

impl Principal {
    /// Whether this principal is a platform administrator.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.user.role == Role::SuperAdmin
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;

        let session = state
            .sessions
            .session(&bearer.0, Utc::now())
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session token"))?;

        let user = state
            .users
            .user(session.user_id)
            .await
            .map_err(|_| AppError::unauthorized("Invalid or expired session token"))?;
        if !user.active {
            return Err(AppError::unauthorized("This account has been deactivated"));
        }

        Ok(Self { user, session })
    }
}

/// A principal whose role is `super_admin`. Rejects with 403 otherwise.
#[derive(Debug, Clone)]
pub struct RequireSuperAdmin {
    /// The authenticated platform administrator
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        principal
            .user
            .role
            .require(Capability::ManagePlatform)
            .map_err(AppError::from)?;
        Ok(Self {
            user: principal.user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn bearer_token_parses_the_header() {
        let req = Request::builder()
            .header("authorization", "Bearer abc123")
            .body(())
            .expect("valid request");
        let (mut parts, ()) = req.into_parts();
        let token = BearerToken::from_request_parts(&mut parts, &())
            .await
            .expect("token extracted");
        assert_eq!(token.0, "abc123");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let req = Request::builder().body(()).expect("valid request");
        let (mut parts, ()) = req.into_parts();
        let err = BearerToken::from_request_parts(&mut parts, &())
            .await
            .expect_err("must fail");
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn basic_auth_is_rejected() {
        let req = Request::builder()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .expect("valid request");
        let (mut parts, ()) = req.into_parts();
        assert!(BearerToken::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }
}
