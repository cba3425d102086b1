//! Category model
//!
//! Categories classify events and cosplay collections. Events reference a
//! category with protect-on-delete semantics: a category cannot be removed
//! while events still point at it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: Uuid,
    /// Category name (e.g. "Cosplay Contest")
    pub name: String,
    /// URL-friendly slug (unique, generated from the name)
    pub slug: String,
    /// Optional description
    pub description: Option<String>,
    /// What the category classifies
    pub kind: CategoryKind,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category with a generated id and slug
    pub fn new(name: String, slug: String, description: Option<String>, kind: CategoryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            description,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// What a category classifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Event categories
    Event,
    /// Cosplay collection categories
    Collection,
}

impl CategoryKind {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Event => "event",
            CategoryKind::Collection => "collection",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "event" => Ok(CategoryKind::Event),
            "collection" => Ok(CategoryKind::Collection),
            _ => Err(anyhow::anyhow!("Invalid category kind: {}", s)),
        }
    }
}

/// Input for creating a new category
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    /// Category name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// What the category classifies
    pub kind: CategoryKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_kind_roundtrip() {
        assert_eq!(CategoryKind::from_str("event").unwrap(), CategoryKind::Event);
        assert_eq!(
            CategoryKind::from_str("COLLECTION").unwrap(),
            CategoryKind::Collection
        );
        assert_eq!(CategoryKind::Event.to_string(), "event");
        assert!(CategoryKind::from_str("other").is_err());
    }

    #[test]
    fn test_category_new_generates_id() {
        let a = Category::new("Contests".into(), "contests".into(), None, CategoryKind::Event);
        let b = Category::new("Contests".into(), "contests-2".into(), None, CategoryKind::Event);
        assert_ne!(a.id, b.id);
    }
}
