//! Category service
//!
//! Business logic for category management:
//! - Create, read, list, delete categories
//! - Slug generation from the name, with numeric suffixes on collisions
//! - Protect-on-delete: a category referenced by events cannot be removed

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryKind, CreateCategoryInput, FieldErrors};
use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// One or more fields failed validation
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Category not found
    #[error("category not found")]
    NotFound,

    /// Internal error (storage failure)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a new category with a slug generated from its name
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CategoryServiceError::Validation(FieldErrors::single(
                "name",
                "This field may not be blank.",
            )));
        }

        let slug = self.unique_slug(name).await?;
        let category = Category::new(name.to_string(), slug, input.description, input.kind);

        let created = self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?;

        Ok(created)
    }

    /// Get a category by id
    pub async fn get(&self, id: Uuid) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound)
    }

    /// List categories, optionally restricted to one kind
    pub async fn list(&self, kind: Option<CategoryKind>) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self
            .repo
            .list(kind)
            .await
            .context("Failed to list categories")?)
    }

    /// Delete a category.
    ///
    /// Refused while events still reference it (protect-on-delete).
    pub async fn delete(&self, id: Uuid) -> Result<(), CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound)?;

        let references = self
            .repo
            .event_count(id)
            .await
            .context("Failed to count referencing events")?;
        if references > 0 {
            return Err(CategoryServiceError::Validation(FieldErrors::single(
                "category",
                format!(
                    "Cannot delete: {} event(s) still reference this category.",
                    references
                ),
            )));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;
        Ok(())
    }

    /// Generate a slug from the name, appending a numeric suffix until it
    /// is unique
    async fn unique_slug(&self, name: &str) -> Result<String, CategoryServiceError> {
        let base = generate_slug(name);
        let base = if base.is_empty() { "category".to_string() } else { base };

        let mut candidate = base.clone();
        let mut counter = 2;
        while self
            .repo
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

/// Generate a URL-friendly slug from a name.
///
/// Lowercases, replaces spaces and ASCII punctuation with hyphens, keeps
/// non-ASCII characters, and collapses consecutive hyphens.
pub fn generate_slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if !c.is_ascii() {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxEventRepository, EventRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{Event, EventScope, EventStatus, EventType};
    use chrono::{Duration, Utc};

    async fn setup_test_service() -> (DynDatabasePool, CategoryService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()));
        (pool, service)
    }

    fn event_input() -> CreateCategoryInput {
        CreateCategoryInput {
            name: "Cosplay Contest".to_string(),
            description: None,
            kind: CategoryKind::Event,
        }
    }

    // ========================================================================
    // Slug generation tests
    // ========================================================================

    #[test]
    fn test_generate_slug_simple() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
    }

    #[test]
    fn test_generate_slug_with_special_chars() {
        assert_eq!(generate_slug("Concurso: Cosplay!"), "concurso-cosplay");
    }

    #[test]
    fn test_generate_slug_keeps_accents() {
        assert_eq!(generate_slug("Exposição Temática"), "exposição-temática");
    }

    #[test]
    fn test_generate_slug_collapses_hyphens() {
        assert_eq!(generate_slug("a  -  b"), "a-b");
    }

    // ========================================================================
    // Service tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_category_generates_slug() {
        let (_pool, service) = setup_test_service().await;
        let category = service.create(event_input()).await.expect("Create failed");

        assert_eq!(category.slug, "cosplay-contest");
        assert_eq!(category.kind, CategoryKind::Event);
    }

    #[tokio::test]
    async fn test_create_duplicate_name_gets_suffixed_slug() {
        let (_pool, service) = setup_test_service().await;
        service.create(event_input()).await.unwrap();
        let second = service.create(event_input()).await.unwrap();
        let third = service.create(event_input()).await.unwrap();

        assert_eq!(second.slug, "cosplay-contest-2");
        assert_eq!(third.slug, "cosplay-contest-3");
    }

    #[tokio::test]
    async fn test_create_blank_name_fails() {
        let (_pool, service) = setup_test_service().await;
        let result = service
            .create(CreateCategoryInput {
                name: "   ".to_string(),
                description: None,
                kind: CategoryKind::Event,
            })
            .await;

        assert!(matches!(result, Err(CategoryServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_missing_category() {
        let (_pool, service) = setup_test_service().await;
        let result = service.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CategoryServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_unreferenced_category() {
        let (_pool, service) = setup_test_service().await;
        let category = service.create(event_input()).await.unwrap();

        service.delete(category.id).await.expect("Delete failed");
        assert!(matches!(
            service.get(category.id).await,
            Err(CategoryServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_referenced_category_is_blocked() {
        let (pool, service) = setup_test_service().await;
        let category = service.create(event_input()).await.unwrap();

        // Reference the category from an event
        let events = SqlxEventRepository::new(pool.clone());
        let now = Utc::now();
        events
            .create(&Event {
                id: Uuid::new_v4(),
                title: "Con".into(),
                slug: "con".into(),
                description: None,
                start_at: now + Duration::days(5),
                end_at: None,
                location: None,
                category_id: category.id,
                event_type: EventType::Contest,
                scope: EventScope::National,
                status: EventStatus::Published,
                cover_image: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let result = service.delete(category.id).await;
        match result {
            Err(CategoryServiceError::Validation(errors)) => {
                assert!(errors.contains("category"));
            }
            other => panic!("Expected validation error, got {:?}", other.is_ok()),
        }

        // The category is still there
        assert!(service.get(category.id).await.is_ok());
    }
}
