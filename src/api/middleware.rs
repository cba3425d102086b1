//! API middleware
//!
//! Contains:
//! - `AppState`, the shared service handle for all handlers
//! - `ApiError`, the single error response type of the HTTP boundary
//! - Actor resolution from the bearer token (degrades to anonymous)
//! - `require_auth` / `require_superuser` route guards

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::permissions::{Access, Actor, Policy};
use crate::models::{FieldErrors, User};
use crate::services::auth::AuthServiceError;
use crate::services::category::CategoryServiceError;
use crate::services::event::EventServiceError;
use crate::services::token::{TokenError, TokenKind};
use crate::services::{AuthService, CategoryService, EventService, TokenService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub event_service: Arc<EventService>,
    pub category_service: Arc<CategoryService>,
}

/// Authenticated user extracted from request extensions.
///
/// Rejects with 401 when the actor is anonymous.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Actor>() {
            Some(Actor::Authenticated(user)) => Ok(AuthenticatedUser(user.clone())),
            _ => Err(ApiError::unauthorized(
                "Authentication credentials were not provided.",
            )),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Validation error carrying the field→messages map
    pub fn validation(errors: FieldErrors) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: "Validation failed.".to_string(),
                details: Some(serde_json::to_value(&errors).unwrap_or_default()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(e: AuthServiceError) -> Self {
        match e {
            AuthServiceError::Validation(errors) => ApiError::validation(errors),
            AuthServiceError::Unauthorized => {
                ApiError::unauthorized("Invalid username or password.")
            }
            AuthServiceError::Internal(e) => {
                tracing::error!("auth service error: {:#}", e);
                ApiError::internal_error("Internal server error.")
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken => ApiError::unauthorized("Token is invalid or expired."),
            TokenError::Internal(e) => {
                tracing::error!("token service error: {:#}", e);
                ApiError::internal_error("Internal server error.")
            }
        }
    }
}

impl From<EventServiceError> for ApiError {
    fn from(e: EventServiceError) -> Self {
        match e {
            EventServiceError::Validation(errors) => ApiError::validation(errors),
            EventServiceError::NotFound => ApiError::not_found("Event not found."),
            EventServiceError::Internal(e) => {
                tracing::error!("event service error: {:#}", e);
                ApiError::internal_error("Internal server error.")
            }
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::Validation(errors) => ApiError::validation(errors),
            CategoryServiceError::NotFound => ApiError::not_found("Category not found."),
            CategoryServiceError::Internal(e) => {
                tracing::error!("category service error: {:#}", e);
                ApiError::internal_error("Internal server error.")
            }
        }
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Actor resolution middleware.
///
/// Runs on every API request. Resolves the bearer access token to an
/// account and stores the result as an `Actor` extension. Resolution never
/// fails the request: any token problem degrades to `Actor::Anonymous`,
/// leaving the decision to the per-route policy.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = match extract_bearer_token(request.headers()) {
        Some(token) => actor_from_token(&state, &token).await,
        None => Actor::Anonymous,
    };

    request.extensions_mut().insert(actor);
    next.run(request).await
}

async fn actor_from_token(state: &AppState, token: &str) -> Actor {
    let claims = match state.token_service.verify(token, TokenKind::Access).await {
        Ok(claims) => claims,
        Err(_) => return Actor::Anonymous,
    };

    let account_id = match claims.account_id() {
        Ok(id) => id,
        Err(_) => return Actor::Anonymous,
    };

    match state.auth_service.get_by_id(account_id).await {
        Ok(Some(user)) => Actor::Authenticated(user),
        Ok(None) => Actor::Anonymous,
        Err(e) => {
            tracing::warn!("actor resolution failed: {}", e);
            Actor::Anonymous
        }
    }
}

/// Authentication guard: rejects anonymous actors with 401
pub async fn require_auth(request: Request, next: Next) -> Result<Response, ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .cloned()
        .unwrap_or(Actor::Anonymous);

    if !actor.is_authenticated() {
        return Err(ApiError::unauthorized(
            "Authentication credentials were not provided.",
        ));
    }

    Ok(next.run(request).await)
}

/// Superuser guard for write routes.
///
/// Anonymous callers get 401; authenticated non-superusers get 403.
pub async fn require_superuser(request: Request, next: Next) -> Result<Response, ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .cloned()
        .unwrap_or(Actor::Anonymous);

    if !actor.is_authenticated() {
        return Err(ApiError::unauthorized(
            "Authentication credentials were not provided.",
        ));
    }

    if !Policy::AnyoneReadSuperuserWrite.allows(&actor, Access::Write) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action.",
        ));
    }

    Ok(next.run(request).await)
}
