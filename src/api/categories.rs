//! Category API endpoints
//!
//! Handles HTTP requests for category management:
//! - GET    /api/categories - List categories (filterable by kind)
//! - GET    /api/categories/{id} - Category detail
//! - POST   /api/categories - Create (superuser)
//! - DELETE /api/categories/{id} - Delete (superuser, protect-on-delete)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CategoryKind, CreateCategoryInput, FieldErrors};

/// Query parameters for listing categories
#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    pub kind: Option<String>,
}

/// Build the public categories router (read-only)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
}

/// Build the superuser categories router (writes)
pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category))
        .route("/{id}", delete(delete_category))
}

/// GET /api/categories - List categories
async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let kind = match &query.kind {
        Some(raw) => Some(CategoryKind::from_str(raw).map_err(|_| {
            ApiError::validation(FieldErrors::single("kind", "Select a valid choice."))
        })?),
        None => None,
    };

    let categories = state.category_service.list(kind).await?;
    Ok(Json(categories))
}

/// GET /api/categories/{id} - Category detail
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    let category = state.category_service.get(id).await?;
    Ok(Json(category))
}

/// POST /api/categories - Create a category
async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /api/categories/{id} - Delete a category.
///
/// Fails with a validation error while events still reference it.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
