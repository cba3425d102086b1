//! Event service
//!
//! Business logic for the event catalogue:
//! - CRUD with field-level validation
//! - The query pipeline: filter, search, order, paginate over the event
//!   collection
//! - Convenience views (upcoming, past, highlights, related)
//! - Cover-image orchestration with a compensating delete when the upload
//!   fails after the event row was created

use crate::db::repositories::{CategoryRepository, EventRepository, PartnerRepository};
use crate::models::{
    Category, CategoryKind, CreateEventInput, Event, EventScope, EventStatus, EventType,
    FieldErrors, ListParams, PagedResult, Partner, UpdateEventInput,
};
use crate::services::category::generate_slug;
use crate::services::media::{ImageHost, ImageUpload};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Maximum event duration in days
const MAX_DURATION_DAYS: i64 = 365;

/// Default number of items in the upcoming/past views
const DEFAULT_VIEW_LIMIT: usize = 10;

/// Hard cap for the highlights view
const HIGHLIGHTS_LIMIT: usize = 3;

/// Hard cap for the related-events view
const RELATED_LIMIT: usize = 5;

/// Error types for event service operations
#[derive(Debug, thiserror::Error)]
pub enum EventServiceError {
    /// One or more fields failed validation
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Event not found
    #[error("event not found")]
    NotFound,

    /// Internal error (storage failure)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Sortable fields of the event list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    StartAt,
    CreatedAt,
    Title,
}

/// Requested ordering: a field and a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for Ordering {
    /// Most recent start date first
    fn default() -> Self {
        Self {
            field: OrderField::StartAt,
            descending: true,
        }
    }
}

impl Ordering {
    /// Parse an ordering parameter ("data_inicio", "-created_at", "titulo").
    ///
    /// Unknown fields yield `None`; the caller falls back to the default.
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, field) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let field = match field {
            "data_inicio" => OrderField::StartAt,
            "created_at" => OrderField::CreatedAt,
            "titulo" => OrderField::Title,
            _ => return None,
        };

        Some(Self { field, descending })
    }
}

/// Filter and ordering parameters of an event list query
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Exact category id
    pub category: Option<Uuid>,
    /// Case-insensitive exact category slug
    pub category_slug: Option<String>,
    /// Event type membership
    pub event_type: Option<EventType>,
    /// Status membership
    pub status: Option<EventStatus>,
    /// Scope membership
    pub scope: Option<EventScope>,
    /// Inclusive lower bound on the start date
    pub start_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the start date
    pub start_before: Option<DateTime<Utc>>,
    /// Case-insensitive substring over title, description and location
    pub search: Option<String>,
    /// Requested ordering
    pub ordering: Ordering,
}

/// Apply the filter, search and order steps of the pipeline to a
/// collection of events in storage order. The sort is stable, so storage
/// order breaks ties.
///
/// `categories` supplies the slug lookup for the category_slug filter.
pub fn apply_query(mut events: Vec<Event>, query: &EventQuery, categories: &[Category]) -> Vec<Event> {
    // Filter
    if let Some(category) = query.category {
        events.retain(|e| e.category_id == category);
    }
    if let Some(slug) = &query.category_slug {
        let slug = slug.to_lowercase();
        let matching: Vec<Uuid> = categories
            .iter()
            .filter(|c| c.slug.to_lowercase() == slug)
            .map(|c| c.id)
            .collect();
        events.retain(|e| matching.contains(&e.category_id));
    }
    if let Some(event_type) = query.event_type {
        events.retain(|e| e.event_type == event_type);
    }
    if let Some(status) = query.status {
        events.retain(|e| e.status == status);
    }
    if let Some(scope) = query.scope {
        events.retain(|e| e.scope == scope);
    }
    if let Some(after) = query.start_after {
        events.retain(|e| e.start_at >= after);
    }
    if let Some(before) = query.start_before {
        events.retain(|e| e.start_at <= before);
    }

    // Search: OR across title, description and location, AND with the
    // filters above
    if let Some(term) = &query.search {
        let term = term.to_lowercase();
        if !term.is_empty() {
            events.retain(|e| {
                e.title.to_lowercase().contains(&term)
                    || e.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
                    || e.location
                        .as_deref()
                        .is_some_and(|l| l.to_lowercase().contains(&term))
            });
        }
    }

    // Order (stable)
    let ordering = query.ordering;
    events.sort_by(|a, b| {
        let cmp = match ordering.field {
            OrderField::StartAt => a.start_at.cmp(&b.start_at),
            OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderField::Title => a.title.cmp(&b.title),
        };
        if ordering.descending {
            cmp.reverse()
        } else {
            cmp
        }
    });

    events
}

/// Slice one page out of an ordered collection
pub fn paginate(events: Vec<Event>, params: &ListParams) -> PagedResult<Event> {
    let total = events.len() as u64;
    let start = params.offset().min(events.len());
    let end = (start + params.page_size as usize).min(events.len());
    let items = events[start..end].to_vec();
    PagedResult::new(items, total, params)
}

/// Event service
pub struct EventService {
    events: Arc<dyn EventRepository>,
    categories: Arc<dyn CategoryRepository>,
    partners: Arc<dyn PartnerRepository>,
    image_host: Arc<dyn ImageHost>,
}

impl EventService {
    /// Create a new event service
    pub fn new(
        events: Arc<dyn EventRepository>,
        categories: Arc<dyn CategoryRepository>,
        partners: Arc<dyn PartnerRepository>,
        image_host: Arc<dyn ImageHost>,
    ) -> Self {
        Self {
            events,
            categories,
            partners,
            image_host,
        }
    }

    /// Run the full query pipeline and return one page of events
    pub async fn list(
        &self,
        query: &EventQuery,
        params: &ListParams,
    ) -> Result<PagedResult<Event>, EventServiceError> {
        let events = self.events.list_all().await.context("Failed to load events")?;
        let categories = self
            .categories
            .list(None)
            .await
            .context("Failed to load categories")?;

        let filtered = apply_query(events, query, &categories);
        Ok(paginate(filtered, params))
    }

    /// Get an event by id
    pub async fn get(&self, id: Uuid) -> Result<Event, EventServiceError> {
        self.events
            .get_by_id(id)
            .await
            .context("Failed to get event")?
            .ok_or(EventServiceError::NotFound)
    }

    /// Partners credited on an event
    pub async fn partners_for(&self, event_id: Uuid) -> Result<Vec<Partner>, EventServiceError> {
        Ok(self
            .partners
            .list_for_event(event_id)
            .await
            .context("Failed to load event partners")?)
    }

    /// Create a new event, optionally uploading a cover image.
    ///
    /// The event row is created first; when the image upload fails
    /// afterwards, the row is deleted again so no event ends up referencing
    /// a missing image, and the upstream message surfaces as a validation
    /// error on the cover image field.
    pub async fn create(
        &self,
        input: CreateEventInput,
        image: Option<ImageUpload>,
        now: DateTime<Utc>,
    ) -> Result<Event, EventServiceError> {
        let mut errors = FieldErrors::new();

        self.check_category(input.category_id, &mut errors).await?;
        // Start must not be in the past at creation time; editing
        // historical events later is allowed.
        if input.start_at < now {
            errors.push("start_at", "Start date cannot be in the past.");
        }
        check_date_window(input.start_at, input.end_at, &mut errors);
        let partner_ids = self.check_partners(&input.partner_ids, &mut errors).await?;

        if input.title.trim().is_empty() {
            errors.push("title", "This field may not be blank.");
        }

        if !errors.is_empty() {
            return Err(EventServiceError::Validation(errors));
        }

        let slug = self.unique_slug(&input.title).await?;
        let event = Event {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            slug,
            description: input.description,
            start_at: input.start_at,
            end_at: input.end_at,
            location: input.location,
            category_id: input.category_id,
            event_type: input.event_type,
            scope: input.scope,
            status: input.status,
            cover_image: input.cover_image,
            created_at: now,
            updated_at: now,
        };

        let mut created = self
            .events
            .create(&event)
            .await
            .context("Failed to create event")?;

        self.partners
            .set_event_partners(created.id, &partner_ids)
            .await
            .context("Failed to link partners")?;

        if let Some(image) = image {
            match self.image_host.upload(image).await {
                Ok(uploaded) => {
                    self.events
                        .set_cover_image(created.id, &uploaded.secure_url)
                        .await
                        .context("Failed to store cover image")?;
                    created.cover_image = Some(uploaded.secure_url);
                }
                Err(e) => {
                    // Compensating action: the event must not survive
                    // pointing at an image that was never stored.
                    tracing::warn!("Cover upload failed, deleting event {}: {}", created.id, e);
                    self.events
                        .delete(created.id)
                        .await
                        .context("Failed to delete event after upload failure")?;
                    return Err(EventServiceError::Validation(FieldErrors::single(
                        "cover_image",
                        format!("Image upload failed: {}", e),
                    )));
                }
            }
        }

        Ok(created)
    }

    /// Update an event with partial semantics.
    ///
    /// The creation-only "start not in the past" rule is not applied here,
    /// so historical events stay editable.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateEventInput,
        now: DateTime<Utc>,
    ) -> Result<Event, EventServiceError> {
        let mut event = self.get(id).await?;
        let mut errors = FieldErrors::new();

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                errors.push("title", "This field may not be blank.");
            }
        }
        if let Some(category_id) = input.category_id {
            self.check_category(category_id, &mut errors).await?;
        }

        let start_at = input.start_at.unwrap_or(event.start_at);
        let end_at = match input.end_at {
            Some(end) => Some(end),
            None => event.end_at,
        };
        check_date_window(start_at, end_at, &mut errors);

        let partner_ids = match &input.partner_ids {
            Some(ids) => Some(self.check_partners(ids, &mut errors).await?),
            None => None,
        };

        if !errors.is_empty() {
            return Err(EventServiceError::Validation(errors));
        }

        if let Some(title) = input.title {
            event.title = title.trim().to_string();
        }
        if let Some(description) = input.description {
            event.description = Some(description);
        }
        event.start_at = start_at;
        event.end_at = end_at;
        if let Some(location) = input.location {
            event.location = Some(location);
        }
        if let Some(category_id) = input.category_id {
            event.category_id = category_id;
        }
        if let Some(event_type) = input.event_type {
            event.event_type = event_type;
        }
        if let Some(scope) = input.scope {
            event.scope = scope;
        }
        if let Some(status) = input.status {
            event.status = status;
        }
        if let Some(cover_image) = input.cover_image {
            event.cover_image = Some(cover_image);
        }
        event.updated_at = now;

        let updated = self
            .events
            .update(&event)
            .await
            .context("Failed to update event")?;

        if let Some(partner_ids) = partner_ids {
            self.partners
                .set_event_partners(id, &partner_ids)
                .await
                .context("Failed to relink partners")?;
        }

        Ok(updated)
    }

    /// Delete an event.
    ///
    /// When the event carries a hosted cover image, its removal from the
    /// image host is attempted best-effort after the row is gone; a failed
    /// destroy only leaves an unreferenced upload behind.
    pub async fn delete(&self, id: Uuid) -> Result<(), EventServiceError> {
        let event = self.get(id).await?;
        self.events
            .delete(id)
            .await
            .context("Failed to delete event")?;

        if let Some(public_id) = event.cover_image.as_deref().and_then(cover_public_id) {
            if let Err(e) = self.image_host.destroy(&public_id).await {
                tracing::warn!("Failed to remove cover image {}: {}", public_id, e);
            }
        }

        Ok(())
    }

    /// Published events starting at or after `now`, soonest first
    pub async fn upcoming(
        &self,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, EventServiceError> {
        let mut events = self.events.list_all().await.context("Failed to load events")?;
        events.retain(|e| e.start_at >= now && e.status == EventStatus::Published);
        events.sort_by(|a, b| a.start_at.cmp(&b.start_at));
        events.truncate(limit.unwrap_or(DEFAULT_VIEW_LIMIT));
        Ok(events)
    }

    /// Events that already started, most recent first
    pub async fn past(
        &self,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, EventServiceError> {
        let mut events = self.events.list_all().await.context("Failed to load events")?;
        events.retain(|e| e.start_at < now);
        events.sort_by(|a, b| b.start_at.cmp(&a.start_at));
        events.truncate(limit.unwrap_or(DEFAULT_VIEW_LIMIT));
        Ok(events)
    }

    /// Highlighted events.
    ///
    /// Currently the next three published events; a dedicated featured
    /// flag is a product decision that has not been made yet.
    pub async fn highlights(&self, now: DateTime<Utc>) -> Result<Vec<Event>, EventServiceError> {
        self.upcoming(Some(HIGHLIGHTS_LIMIT), now).await
    }

    /// Published events in the same category, excluding the event itself
    pub async fn related(&self, id: Uuid) -> Result<Vec<Event>, EventServiceError> {
        let event = self.get(id).await?;
        let mut events = self.events.list_all().await.context("Failed to load events")?;
        events.retain(|e| {
            e.category_id == event.category_id
                && e.id != event.id
                && e.status == EventStatus::Published
        });
        events.truncate(RELATED_LIMIT);
        Ok(events)
    }

    async fn check_category(
        &self,
        category_id: Uuid,
        errors: &mut FieldErrors,
    ) -> Result<(), EventServiceError> {
        let category = self
            .categories
            .get_by_id(category_id)
            .await
            .context("Failed to look up category")?;

        match category {
            Some(category) if category.kind == CategoryKind::Event => {}
            Some(_) => errors.push("category_id", "Category is not an event category."),
            None => errors.push("category_id", "Category not found."),
        }
        Ok(())
    }

    async fn check_partners(
        &self,
        partner_ids: &[Uuid],
        errors: &mut FieldErrors,
    ) -> Result<Vec<Uuid>, EventServiceError> {
        if partner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self
            .partners
            .get_active_by_ids(partner_ids)
            .await
            .context("Failed to look up partners")?;

        if found.len() != partner_ids.len() {
            errors.push("partner_ids", "One or more partners were not found.");
        }

        Ok(found.into_iter().map(|p| p.id).collect())
    }

    async fn unique_slug(&self, title: &str) -> Result<String, EventServiceError> {
        let base = generate_slug(title);
        let base = if base.is_empty() { "event".to_string() } else { base };

        let mut candidate = base.clone();
        let mut counter = 2;
        while self
            .events
            .exists_by_slug(&candidate)
            .await
            .context("Failed to check slug")?
        {
            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }

        Ok(candidate)
    }
}

/// Extract the image host public id from an upload URL: everything after
/// `/upload/`, minus the file extension. Returns `None` for URLs that do
/// not come from the image host.
fn cover_public_id(url: &str) -> Option<String> {
    let rest = url.split_once("/upload/")?.1;
    let public_id = rest.rsplit_once('.').map(|(base, _)| base).unwrap_or(rest);
    if public_id.is_empty() {
        None
    } else {
        Some(public_id.to_string())
    }
}

/// Cross-field date validations shared by create and update
fn check_date_window(
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    errors: &mut FieldErrors,
) {
    if let Some(end) = end_at {
        if end < start_at {
            errors.push("end_at", "End date must be after the start date.");
        } else if (end - start_at) > Duration::days(MAX_DURATION_DAYS) {
            errors.push("end_at", "An event cannot last longer than one year.");
        }
    }
}
