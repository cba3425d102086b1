//! Domain models
//!
//! Entities and value types shared across the service and API layers:
//! - `User` account entity and its public projection rules
//! - `Event` with its type/scope/status enums and computed projections
//! - `Category` and `Partner` reference entities
//! - Pagination types (`ListParams`, `PagedResult`)
//! - `FieldErrors`, the field→messages map used by validation failures

pub mod category;
pub mod event;
pub mod partner;
pub mod user;

pub use category::{Category, CategoryKind, CreateCategoryInput};
pub use event::{
    CreateEventInput, Event, EventScope, EventStatus, EventType, ListParams, PagedResult,
    UpdateEventInput,
};
pub use partner::{Partner, PartnerKind};
pub use user::User;

use std::collections::BTreeMap;

/// Map of field name to the list of validation messages for that field.
///
/// Every violated field is reported, not just the first one. A `BTreeMap`
/// keeps serialization order deterministic for clients and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map with a single field error
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Add a message to a field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Check whether any field has errors
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether a specific field has errors
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, messages.join(", "))?;
            first = false;
        }
        Ok(())
    }
}
