//! Event model
//!
//! This module provides:
//! - `Event` entity representing a covered community event
//! - `EventType`, `EventScope` and `EventStatus` enums
//! - Computed read-only projections (days until, duration, has occurred)
//! - Input types for creating and updating events
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Event entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    pub id: Uuid,
    /// Event title (e.g. "Anima Luanda 2026")
    pub title: String,
    /// URL-friendly slug (unique, generated from the title)
    pub slug: String,
    /// Full description
    pub description: Option<String>,
    /// Start date and time
    pub start_at: DateTime<Utc>,
    /// End date and time (optional for single-day events)
    pub end_at: Option<DateTime<Utc>>,
    /// Venue
    pub location: Option<String>,
    /// Category reference (protect-on-delete)
    pub category_id: Uuid,
    /// Kind of event
    pub event_type: EventType,
    /// Geographic scope
    pub scope: EventScope,
    /// Publication status
    pub status: EventStatus,
    /// Cover image URL (image host)
    pub cover_image: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whole days until the event starts, relative to `now`.
    ///
    /// Negative when the event already started.
    pub fn days_until(&self, now: DateTime<Utc>) -> i64 {
        (self.start_at - now).num_days()
    }

    /// Event duration in whole days.
    ///
    /// Counts both the first and the last day, so a two-night event spans
    /// three days. Events without an end date last one day.
    pub fn duration_days(&self) -> i64 {
        match self.end_at {
            Some(end) => ((end - self.start_at).num_days() + 1).max(1),
            None => 1,
        }
    }

    /// Whether the event is over, relative to `now`.
    ///
    /// Uses the end date when present, otherwise the start date.
    pub fn has_occurred(&self, now: DateTime<Utc>) -> bool {
        now > self.end_at.unwrap_or(self.start_at)
    }
}

/// Kind of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Cosplay contest
    Contest,
    /// Themed exhibition
    Exhibition,
    /// Workshop
    Workshop,
    /// Coverage of an external event
    Coverage,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Contest => "contest",
            EventType::Exhibition => "exhibition",
            EventType::Workshop => "workshop",
            EventType::Coverage => "coverage",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contest" => Ok(EventType::Contest),
            "exhibition" => Ok(EventType::Exhibition),
            "workshop" => Ok(EventType::Workshop),
            "coverage" => Ok(EventType::Coverage),
            _ => Err(anyhow::anyhow!("Invalid event type: {}", s)),
        }
    }
}

/// Geographic scope of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    National,
    International,
}

impl Default for EventScope {
    fn default() -> Self {
        Self::National
    }
}

impl EventScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventScope::National => "national",
            EventScope::International => "international",
        }
    }
}

impl fmt::Display for EventScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "national" => Ok(EventScope::National),
            "international" => Ok(EventScope::International),
            _ => Err(anyhow::anyhow!("Invalid event scope: {}", s)),
        }
    }
}

/// Publication status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Draft - not visible as published
    Draft,
    /// Published
    Published,
    /// Finalized - the event took place and coverage is complete
    Finalized,
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "finalized" => Ok(EventStatus::Finalized),
            _ => Err(anyhow::anyhow!("Invalid event status: {}", s)),
        }
    }
}

/// Input for creating a new event
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    pub category_id: Uuid,
    pub event_type: EventType,
    #[serde(default)]
    pub scope: EventScope,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Partner ids to credit on the event
    #[serde(default)]
    pub partner_ids: Vec<Uuid>,
}

/// Input for updating an existing event.
///
/// All fields are optional; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub event_type: Option<EventType>,
    pub scope: Option<EventScope>,
    pub status: Option<EventStatus>,
    pub cover_image: Option<String>,
    pub partner_ids: Option<Vec<Uuid>>,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamping the page size to 1..=100
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, 100),
        }
    }

    /// Offset of the first item of this page
    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.page_size) as usize
    }
}

/// Paginated result container
#[derive(Debug, Clone)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: u64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
        }
    }

    /// Total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        ((self.total + self.page_size as u64 - 1) / self.page_size as u64) as u32
    }

    /// Whether there is a page after this one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Whether there is a page before this one
    pub fn has_prev(&self) -> bool {
        self.page > 1 && self.total > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event(start_at: DateTime<Utc>, end_at: Option<DateTime<Utc>>) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Anima Luanda".to_string(),
            slug: "anima-luanda".to_string(),
            description: None,
            start_at,
            end_at,
            location: None,
            category_id: Uuid::new_v4(),
            event_type: EventType::Contest,
            scope: EventScope::National,
            status: EventStatus::Published,
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ========================================================================
    // Computed projection tests
    // ========================================================================

    #[test]
    fn test_days_until_future_event() {
        let now = Utc::now();
        let event = sample_event(now + Duration::days(30), None);
        assert_eq!(event.days_until(now), 30);
    }

    #[test]
    fn test_days_until_past_event_is_negative() {
        let now = Utc::now();
        let event = sample_event(now - Duration::days(10), None);
        assert!(event.days_until(now) < 0);
    }

    #[test]
    fn test_duration_days_two_night_event() {
        // start now+60d, end now+62d: spans three calendar days
        let now = Utc::now();
        let event = sample_event(now + Duration::days(60), Some(now + Duration::days(62)));
        assert_eq!(event.duration_days(), 3);
        assert!(!event.has_occurred(now));
    }

    #[test]
    fn test_duration_days_without_end_date() {
        let event = sample_event(Utc::now(), None);
        assert_eq!(event.duration_days(), 1);
    }

    #[test]
    fn test_duration_days_same_day() {
        let now = Utc::now();
        let event = sample_event(now, Some(now + Duration::hours(6)));
        assert_eq!(event.duration_days(), 1);
    }

    #[test]
    fn test_has_occurred_uses_end_date_when_present() {
        let now = Utc::now();
        // Started yesterday but runs until tomorrow: still ongoing
        let event = sample_event(now - Duration::days(1), Some(now + Duration::days(1)));
        assert!(!event.has_occurred(now));

        let finished = sample_event(now - Duration::days(3), Some(now - Duration::days(1)));
        assert!(finished.has_occurred(now));
    }

    #[test]
    fn test_has_occurred_falls_back_to_start_date() {
        let now = Utc::now();
        let event = sample_event(now - Duration::hours(2), None);
        assert!(event.has_occurred(now));
    }

    // ========================================================================
    // Enum parsing tests
    // ========================================================================

    #[test]
    fn test_event_type_roundtrip() {
        for t in [
            EventType::Contest,
            EventType::Exhibition,
            EventType::Workshop,
            EventType::Coverage,
        ] {
            assert_eq!(EventType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(EventType::from_str("parade").is_err());
    }

    #[test]
    fn test_event_status_defaults_to_draft() {
        assert_eq!(EventStatus::default(), EventStatus::Draft);
        assert_eq!(EventScope::default(), EventScope::National);
    }

    #[test]
    fn test_enum_json_representation() {
        assert_eq!(
            serde_json::to_string(&EventStatus::Published).unwrap(),
            "\"published\""
        );
        assert_eq!(
            serde_json::from_str::<EventType>("\"workshop\"").unwrap(),
            EventType::Workshop
        );
    }

    // ========================================================================
    // Pagination tests
    // ========================================================================

    #[test]
    fn test_list_params_clamps_page_size() {
        let params = ListParams::new(0, 500);
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 100);

        let params = ListParams::new(3, 0);
        assert_eq!(params.page_size, 1);
    }

    #[test]
    fn test_list_params_offset() {
        assert_eq!(ListParams::new(1, 10).offset(), 0);
        assert_eq!(ListParams::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_paged_result_total_pages() {
        let params = ListParams::new(1, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![], 15, &params);
        assert_eq!(result.total_pages(), 2);

        let result: PagedResult<i32> = PagedResult::new(vec![], 0, &params);
        assert_eq!(result.total_pages(), 0);

        let result: PagedResult<i32> = PagedResult::new(vec![], 100, &params);
        assert_eq!(result.total_pages(), 10);
    }

    #[test]
    fn test_paged_result_navigation() {
        let params = ListParams::new(1, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![], 15, &params);
        assert!(result.has_next());
        assert!(!result.has_prev());

        let params = ListParams::new(2, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![], 15, &params);
        assert!(!result.has_next());
        assert!(result.has_prev());
    }
}
