//! Authentication API endpoints
//!
//! Handles HTTP requests for the account lifecycle:
//! - POST /api/auth/register - Account registration
//! - POST /api/auth/token - Login (obtain token pair)
//! - POST /api/auth/token/refresh - Rotate a refresh token
//! - GET  /api/auth/user - Current account
//! - POST /api/auth/logout - Revoke a refresh token

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{FieldErrors, User};
use crate::services::auth::{LoginInput, RegisterInput};
use crate::services::token::TokenError;

/// Request body for registration.
///
/// Required fields are `Option` so that structurally missing fields are
/// reported in the same field→messages shape as value-level violations.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Request body for token refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Request body for logout
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
}

/// Public projection of an account.
///
/// Role flags are exposed so clients can adapt their own behavior; the
/// password hash never appears here.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub is_staff: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_superuser: user.is_superuser,
            is_staff: user.is_staff,
        }
    }
}

/// Response for successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub message: String,
}

/// Build the auth router.
///
/// Register, login and refresh are public; the current-user and logout
/// routes sit behind the authentication guard.
pub fn router() -> Router<AppState> {
    let protected = Router::new()
        .route("/user", get(current_user))
        .route("/logout", post(logout))
        .route_layer(axum_middleware::from_fn(
            crate::api::middleware::require_auth,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/token", post(login))
        .route("/token/refresh", post(refresh))
        .merge(protected)
}

/// POST /api/auth/register - Account registration
///
/// Returns the public account projection and a hint that login is a
/// separate step; no tokens are issued here.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut missing = FieldErrors::new();
    for (field, value) in [
        ("username", &body.username),
        ("email", &body.email),
        ("password", &body.password),
        ("password2", &body.password2),
    ] {
        if value.is_none() {
            missing.push(field, "This field is required.");
        }
    }
    if !missing.is_empty() {
        return Err(ApiError::validation(missing));
    }

    let input = RegisterInput {
        username: body.username.unwrap_or_default(),
        email: body.email.unwrap_or_default(),
        password: body.password.unwrap_or_default(),
        password2: body.password2.unwrap_or_default(),
        first_name: body.first_name,
        last_name: body.last_name,
    };

    let user = state.auth_service.register(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            message: "Account registered successfully. Log in to obtain tokens.".to_string(),
        }),
    ))
}

/// POST /api/auth/token - Login
///
/// Missing fields are a validation error; wrong credentials and unknown
/// accounts are one indistinguishable 401.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<crate::services::token::TokenPair>, ApiError> {
    let mut missing = FieldErrors::new();
    if body.username.is_none() {
        missing.push("username", "This field is required.");
    }
    if body.password.is_none() {
        missing.push("password", "This field is required.");
    }
    if !missing.is_empty() {
        return Err(ApiError::validation(missing));
    }

    let user = state
        .auth_service
        .login(LoginInput::new(
            body.username.unwrap_or_default(),
            body.password.unwrap_or_default(),
        ))
        .await?;

    let pair = state.token_service.issue(&user).await?;
    Ok(Json(pair))
}

/// POST /api/auth/token/refresh - Rotate a refresh token
async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<crate::services::token::TokenPair>, ApiError> {
    let refresh_token = body.refresh.ok_or_else(|| {
        ApiError::validation(FieldErrors::single("refresh", "This field is required."))
    })?;

    let pair = state.token_service.refresh(&refresh_token).await?;
    Ok(Json(pair))
}

/// GET /api/auth/user - Current account
async fn current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// POST /api/auth/logout - Revoke a refresh token
///
/// Requires an authenticated actor. Every revocation failure collapses to
/// one generic bad-request answer; the caller learns nothing about which
/// check failed.
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = body.refresh.ok_or_else(|| {
        ApiError::validation(FieldErrors::single("refresh", "This field is required."))
    })?;

    match state.token_service.revoke(&refresh_token).await {
        Ok(()) => Ok((
            StatusCode::RESET_CONTENT,
            Json(serde_json::json!({ "message": "Logged out successfully." })),
        )),
        Err(TokenError::InvalidToken) => {
            Err(ApiError::bad_request("Invalid or already used token."))
        }
        Err(e) => Err(e.into()),
    }
}
