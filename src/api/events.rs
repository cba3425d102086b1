//! Event API endpoints
//!
//! Handles HTTP requests for the event catalogue:
//! - GET    /api/events - Filtered, searched, ordered, paginated list
//! - GET    /api/events/{id} - Full detail
//! - POST   /api/events - Create (superuser), JSON or multipart with image
//! - PUT    /api/events/{id} - Update (superuser)
//! - PATCH  /api/events/{id} - Partial update (superuser)
//! - DELETE /api/events/{id} - Delete (superuser)
//! - GET    /api/events/proximos|passados|destaques - Convenience views
//! - GET    /api/events/{id}/relacionados - Related events

use axum::{
    extract::{FromRequest, Multipart, OriginalUri, Path, Query, Request, State},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    Category, CreateEventInput, Event, EventScope, EventStatus, EventType, FieldErrors,
    ListParams, Partner, UpdateEventInput,
};
use crate::services::event::{EventQuery, Ordering};
use crate::services::media::ImageUpload;

/// Query parameters for listing events
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub category: Option<String>,
    pub category_slug: Option<String>,
    pub tipo_evento: Option<String>,
    pub status: Option<String>,
    pub abrangencia: Option<String>,
    pub data_inicio_after: Option<String>,
    pub data_inicio_before: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

/// Query parameter for the limited convenience views
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub count: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub page_size: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<EventSummaryResponse>,
}

/// Nested category projection
#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub kind: String,
}

impl From<&Category> for CategoryInfo {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            kind: category.kind.to_string(),
        }
    }
}

/// Nested partner projection
#[derive(Debug, Serialize)]
pub struct PartnerInfo {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub logo_url: Option<String>,
}

impl From<Partner> for PartnerInfo {
    fn from(partner: Partner) -> Self {
        Self {
            id: partner.id,
            name: partner.name,
            kind: partner.kind.to_string(),
            logo_url: partner.logo_url,
        }
    }
}

/// List projection of an event
#[derive(Debug, Serialize)]
pub struct EventSummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<CategoryInfo>,
    pub event_type: EventType,
    pub scope: EventScope,
    pub status: EventStatus,
    pub cover_image: Option<String>,
    pub days_until_event: i64,
}

/// Detail projection of an event, with the derived read-only fields
#[derive(Debug, Serialize)]
pub struct EventDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<CategoryInfo>,
    pub event_type: EventType,
    pub scope: EventScope,
    pub status: EventStatus,
    pub cover_image: Option<String>,
    pub partners: Vec<PartnerInfo>,
    pub days_until_event: i64,
    pub duration_days: i64,
    pub has_occurred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn summary_response(
    event: Event,
    categories: &HashMap<Uuid, Category>,
    now: DateTime<Utc>,
) -> EventSummaryResponse {
    EventSummaryResponse {
        days_until_event: event.days_until(now),
        category: categories.get(&event.category_id).map(CategoryInfo::from),
        id: event.id,
        title: event.title,
        slug: event.slug,
        start_at: event.start_at,
        end_at: event.end_at,
        location: event.location,
        event_type: event.event_type,
        scope: event.scope,
        status: event.status,
        cover_image: event.cover_image,
    }
}

fn detail_response(
    event: Event,
    category: Option<&Category>,
    partners: Vec<Partner>,
    now: DateTime<Utc>,
) -> EventDetailResponse {
    EventDetailResponse {
        days_until_event: event.days_until(now),
        duration_days: event.duration_days(),
        has_occurred: event.has_occurred(now),
        category: category.map(CategoryInfo::from),
        partners: partners.into_iter().map(PartnerInfo::from).collect(),
        id: event.id,
        title: event.title,
        slug: event.slug,
        description: event.description,
        start_at: event.start_at,
        end_at: event.end_at,
        location: event.location,
        event_type: event.event_type,
        scope: event.scope,
        status: event.status,
        cover_image: event.cover_image,
        created_at: event.created_at,
        updated_at: event.updated_at,
    }
}

/// Build the public events router (read-only)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events))
        .route("/proximos", get(upcoming_events))
        .route("/passados", get(past_events))
        .route("/destaques", get(highlighted_events))
        .route("/{id}", get(get_event))
        .route("/{id}/relacionados", get(related_events))
}

/// Build the superuser events router (writes)
pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_event))
        .route("/{id}", put(update_event).patch(update_event))
        .route("/{id}", delete(delete_event))
}

/// GET /api/events - List events
async fn list_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<EventListResponse>, ApiError> {
    let event_query = build_event_query(&query)?;
    let params = ListParams::new(query.page, query.page_size);
    let now = Utc::now();

    let page = state.event_service.list(&event_query, &params).await?;
    let categories = category_map(&state).await?;

    let next = if page.has_next() {
        Some(page_link(&uri, page.page + 1))
    } else {
        None
    };
    let previous = if page.has_prev() {
        Some(page_link(&uri, page.page - 1))
    } else {
        None
    };

    let total_pages = page.total_pages();
    let results = page
        .items
        .into_iter()
        .map(|event| summary_response(event, &categories, now))
        .collect();

    Ok(Json(EventListResponse {
        count: page.total,
        total_pages,
        current_page: page.page,
        page_size: page.page_size,
        next,
        previous,
        results,
    }))
}

/// GET /api/events/{id} - Event detail
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventDetailResponse>, ApiError> {
    let event = state.event_service.get(id).await?;
    let category = state.category_service.get(event.category_id).await.ok();
    let partners = state.event_service.partners_for(event.id).await?;

    Ok(Json(detail_response(
        event,
        category.as_ref(),
        partners,
        Utc::now(),
    )))
}

/// POST /api/events - Create an event.
///
/// Accepts either a JSON body or multipart/form-data carrying the same
/// fields plus an optional `image` file that is uploaded to the image
/// host. Superuser only (enforced by the route guard).
async fn create_event(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let (input, image) = if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?;
        parse_multipart_event(multipart).await?
    } else {
        let Json(input) = Json::<CreateEventInput>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
        (input, None)
    };

    let now = Utc::now();
    let event = state.event_service.create(input, image, now).await?;

    let category = state.category_service.get(event.category_id).await.ok();
    let partners = state.event_service.partners_for(event.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(detail_response(event, category.as_ref(), partners, now)),
    ))
}

/// PUT|PATCH /api/events/{id} - Update an event (partial semantics)
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateEventInput>,
) -> Result<Json<EventDetailResponse>, ApiError> {
    let now = Utc::now();
    let event = state.event_service.update(id, input, now).await?;

    let category = state.category_service.get(event.category_id).await.ok();
    let partners = state.event_service.partners_for(event.id).await?;

    Ok(Json(detail_response(
        event,
        category.as_ref(),
        partners,
        now,
    )))
}

/// DELETE /api/events/{id} - Delete an event
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.event_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/events/proximos - Upcoming published events
async fn upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<EventDetailResponse>>, ApiError> {
    let now = Utc::now();
    let events = state.event_service.upcoming(query.limit, now).await?;
    detail_list(&state, events, now).await.map(Json)
}

/// GET /api/events/passados - Past events
async fn past_events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<EventDetailResponse>>, ApiError> {
    let now = Utc::now();
    let events = state.event_service.past(query.limit, now).await?;
    detail_list(&state, events, now).await.map(Json)
}

/// GET /api/events/destaques - Highlighted events (the next three)
async fn highlighted_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventDetailResponse>>, ApiError> {
    let now = Utc::now();
    let events = state.event_service.highlights(now).await?;
    detail_list(&state, events, now).await.map(Json)
}

/// GET /api/events/{id}/relacionados - Events in the same category
async fn related_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventSummaryResponse>>, ApiError> {
    let now = Utc::now();
    let events = state.event_service.related(id).await?;
    let categories = category_map(&state).await?;

    Ok(Json(
        events
            .into_iter()
            .map(|event| summary_response(event, &categories, now))
            .collect(),
    ))
}

async fn detail_list(
    state: &AppState,
    events: Vec<Event>,
    now: DateTime<Utc>,
) -> Result<Vec<EventDetailResponse>, ApiError> {
    let categories = category_map(state).await?;
    let mut responses = Vec::with_capacity(events.len());
    for event in events {
        let partners = state.event_service.partners_for(event.id).await?;
        let category = categories.get(&event.category_id);
        responses.push(detail_response(event, category, partners, now));
    }
    Ok(responses)
}

async fn category_map(state: &AppState) -> Result<HashMap<Uuid, Category>, ApiError> {
    Ok(state
        .category_service
        .list(None)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

/// Translate the raw query parameters into an `EventQuery`, reporting
/// every invalid parameter in one validation error
fn build_event_query(query: &ListEventsQuery) -> Result<EventQuery, ApiError> {
    let mut errors = FieldErrors::new();
    let mut result = EventQuery::default();

    if let Some(raw) = &query.category {
        match Uuid::parse_str(raw) {
            Ok(id) => result.category = Some(id),
            Err(_) => errors.push("category", "Enter a valid UUID."),
        }
    }
    result.category_slug = query.category_slug.clone();

    if let Some(raw) = &query.tipo_evento {
        match EventType::from_str(raw) {
            Ok(event_type) => result.event_type = Some(event_type),
            Err(_) => errors.push("tipo_evento", "Select a valid choice."),
        }
    }
    if let Some(raw) = &query.status {
        match EventStatus::from_str(raw) {
            Ok(status) => result.status = Some(status),
            Err(_) => errors.push("status", "Select a valid choice."),
        }
    }
    if let Some(raw) = &query.abrangencia {
        match EventScope::from_str(raw) {
            Ok(scope) => result.scope = Some(scope),
            Err(_) => errors.push("abrangencia", "Select a valid choice."),
        }
    }
    if let Some(raw) = &query.data_inicio_after {
        match parse_datetime_param(raw) {
            Some(at) => result.start_after = Some(at),
            None => errors.push("data_inicio_after", "Enter a valid date/time."),
        }
    }
    if let Some(raw) = &query.data_inicio_before {
        match parse_datetime_param(raw) {
            Some(at) => result.start_before = Some(at),
            None => errors.push("data_inicio_before", "Enter a valid date/time."),
        }
    }

    result.search = query.search.clone();
    if let Some(raw) = &query.ordering {
        match Ordering::parse(raw) {
            Some(ordering) => result.ordering = ordering,
            None => errors.push("ordering", "Select a valid ordering field."),
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(ApiError::validation(errors))
    }
}

/// Accepts RFC 3339 timestamps and bare dates (midnight UTC)
fn parse_datetime_param(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Rebuild the request URI with a different page number, preserving every
/// other query parameter
fn page_link(uri: &Uri, page: u32) -> String {
    let path = uri.path();
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page="))
        .map(|p| p.to_string())
        .collect();
    params.push(format!("page={}", page));
    format!("{}?{}", path, params.join("&"))
}

/// Parse a multipart form into event input plus an optional image file
async fn parse_multipart_event(
    mut multipart: Multipart,
) -> Result<(CreateEventInput, Option<ImageUpload>), ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read image: {}", e)))?;
            image = Some(ImageUpload {
                filename,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read field: {}", e)))?;
            fields.insert(name, value);
        }
    }

    let mut errors = FieldErrors::new();

    let title = fields.get("title").cloned().unwrap_or_default();
    if title.is_empty() {
        errors.push("title", "This field is required.");
    }

    let start_at = match fields.get("start_at").map(|s| parse_datetime_param(s)) {
        Some(Some(at)) => Some(at),
        Some(None) => {
            errors.push("start_at", "Enter a valid date/time.");
            None
        }
        None => {
            errors.push("start_at", "This field is required.");
            None
        }
    };

    let end_at = match fields.get("end_at").map(|s| parse_datetime_param(s)) {
        Some(Some(at)) => Some(at),
        Some(None) => {
            errors.push("end_at", "Enter a valid date/time.");
            None
        }
        None => None,
    };

    let category_id = match fields.get("category_id").map(|s| Uuid::parse_str(s)) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            errors.push("category_id", "Enter a valid UUID.");
            None
        }
        None => {
            errors.push("category_id", "This field is required.");
            None
        }
    };

    let event_type = match fields.get("event_type").map(|s| EventType::from_str(s)) {
        Some(Ok(event_type)) => Some(event_type),
        Some(Err(_)) => {
            errors.push("event_type", "Select a valid choice.");
            None
        }
        None => {
            errors.push("event_type", "This field is required.");
            None
        }
    };

    let scope = match fields.get("scope").map(|s| EventScope::from_str(s)) {
        Some(Ok(scope)) => scope,
        Some(Err(_)) => {
            errors.push("scope", "Select a valid choice.");
            EventScope::default()
        }
        None => EventScope::default(),
    };

    let status = match fields.get("status").map(|s| EventStatus::from_str(s)) {
        Some(Ok(status)) => status,
        Some(Err(_)) => {
            errors.push("status", "Select a valid choice.");
            EventStatus::default()
        }
        None => EventStatus::default(),
    };

    let mut partner_ids = Vec::new();
    if let Some(raw) = fields.get("partner_ids") {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match Uuid::parse_str(part) {
                Ok(id) => partner_ids.push(id),
                Err(_) => errors.push("partner_ids", "Enter valid UUIDs."),
            }
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let input = CreateEventInput {
        title,
        description: fields.get("description").cloned(),
        start_at: start_at.unwrap(),
        end_at,
        location: fields.get("location").cloned(),
        category_id: category_id.unwrap(),
        event_type: event_type.unwrap(),
        scope,
        status,
        cover_image: None,
        partner_ids,
    };

    Ok((input, image))
}
