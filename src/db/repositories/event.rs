//! Event repository
//!
//! Database operations for events. `list_all` returns the whole collection
//! in storage order; filtering, search, ordering and pagination happen in
//! the service layer over that collection.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Event, EventScope, EventStatus, EventType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Event repository trait
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Create a new event
    async fn create(&self, event: &Event) -> Result<Event>;

    /// Get event by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// All events in storage order (oldest insert first)
    async fn list_all(&self) -> Result<Vec<Event>>;

    /// Check if an event slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Persist the mutable fields of an event
    async fn update(&self, event: &Event) -> Result<Event>;

    /// Store the cover image URL of an event
    async fn set_cover_image(&self, id: Uuid, url: &str) -> Result<()>;

    /// Delete an event
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// SQLx-based event repository implementation
pub struct SqlxEventRepository {
    pool: DynDatabasePool,
}

impl SqlxEventRepository {
    /// Create a new SQLx event repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EventRepository for SqlxEventRepository {
    async fn create(&self, event: &Event) -> Result<Event> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), event).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), event).await,
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<Event>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_all_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn update(&self, event: &Event) -> Result<Event> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), event).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), event).await,
        }
    }

    async fn set_cover_image(&self, id: Uuid, url: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_cover_image_sqlite(self.pool.as_sqlite().unwrap(), id, url).await
            }
            DatabaseDriver::Mysql => {
                set_cover_image_mysql(self.pool.as_mysql().unwrap(), id, url).await
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const EVENT_COLUMNS: &str = "id, title, slug, description, start_at, end_at, location, \
                             category_id, event_type, scope, status, cover_image, \
                             created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, event: &Event) -> Result<Event> {
    sqlx::query(
        r#"
        INSERT INTO events (id, title, slug, description, start_at, end_at, location,
                            category_id, event_type, scope, status, cover_image,
                            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.to_string())
    .bind(&event.title)
    .bind(&event.slug)
    .bind(&event.description)
    .bind(event.start_at)
    .bind(event.end_at)
    .bind(&event.location)
    .bind(event.category_id.to_string())
    .bind(event.event_type.as_str())
    .bind(event.scope.as_str())
    .bind(event.status.as_str())
    .bind(&event.cover_image)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(pool)
    .await
    .context("Failed to create event")?;

    Ok(event.clone())
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: Uuid) -> Result<Option<Event>> {
    let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get event by ID")?;

    row.map(|row| row_to_event_sqlite(&row)).transpose()
}

async fn list_all_sqlite(pool: &SqlitePool) -> Result<Vec<Event>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM events ORDER BY created_at, id",
        EVENT_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list events")?;

    rows.iter().map(row_to_event_sqlite).collect()
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check event slug")?;
    Ok(count > 0)
}

async fn update_sqlite(pool: &SqlitePool, event: &Event) -> Result<Event> {
    sqlx::query(
        r#"
        UPDATE events
        SET title = ?, description = ?, start_at = ?, end_at = ?, location = ?,
            category_id = ?, event_type = ?, scope = ?, status = ?, cover_image = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.start_at)
    .bind(event.end_at)
    .bind(&event.location)
    .bind(event.category_id.to_string())
    .bind(event.event_type.as_str())
    .bind(event.scope.as_str())
    .bind(event.status.as_str())
    .bind(&event.cover_image)
    .bind(event.updated_at)
    .bind(event.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update event")?;

    Ok(event.clone())
}

async fn set_cover_image_sqlite(pool: &SqlitePool, id: Uuid, url: &str) -> Result<()> {
    sqlx::query("UPDATE events SET cover_image = ? WHERE id = ?")
        .bind(url)
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to set cover image")?;
    Ok(())
}

async fn delete_sqlite(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete event")?;
    Ok(())
}

fn row_to_event_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Event> {
    let id: String = row.get("id");
    let category_id: String = row.get("category_id");
    let event_type: String = row.get("event_type");
    let scope: String = row.get("scope");
    let status: String = row.get("status");

    Ok(Event {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid event id: {}", id))?,
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        location: row.get("location"),
        category_id: Uuid::parse_str(&category_id)
            .with_context(|| format!("Invalid category id: {}", category_id))?,
        event_type: EventType::from_str(&event_type)?,
        scope: EventScope::from_str(&scope)?,
        status: EventStatus::from_str(&status)?,
        cover_image: row.get("cover_image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, event: &Event) -> Result<Event> {
    sqlx::query(
        r#"
        INSERT INTO events (id, title, slug, description, start_at, end_at, location,
                            category_id, event_type, scope, status, cover_image,
                            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.to_string())
    .bind(&event.title)
    .bind(&event.slug)
    .bind(&event.description)
    .bind(event.start_at)
    .bind(event.end_at)
    .bind(&event.location)
    .bind(event.category_id.to_string())
    .bind(event.event_type.as_str())
    .bind(event.scope.as_str())
    .bind(event.status.as_str())
    .bind(&event.cover_image)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(pool)
    .await
    .context("Failed to create event")?;

    Ok(event.clone())
}

async fn get_by_id_mysql(pool: &MySqlPool, id: Uuid) -> Result<Option<Event>> {
    let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await
        .context("Failed to get event by ID")?;

    row.map(|row| row_to_event_mysql(&row)).transpose()
}

async fn list_all_mysql(pool: &MySqlPool) -> Result<Vec<Event>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM events ORDER BY created_at, id",
        EVENT_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list events")?;

    rows.iter().map(row_to_event_mysql).collect()
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check event slug")?;
    Ok(count > 0)
}

async fn update_mysql(pool: &MySqlPool, event: &Event) -> Result<Event> {
    sqlx::query(
        r#"
        UPDATE events
        SET title = ?, description = ?, start_at = ?, end_at = ?, location = ?,
            category_id = ?, event_type = ?, scope = ?, status = ?, cover_image = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.start_at)
    .bind(event.end_at)
    .bind(&event.location)
    .bind(event.category_id.to_string())
    .bind(event.event_type.as_str())
    .bind(event.scope.as_str())
    .bind(event.status.as_str())
    .bind(&event.cover_image)
    .bind(event.updated_at)
    .bind(event.id.to_string())
    .execute(pool)
    .await
    .context("Failed to update event")?;

    Ok(event.clone())
}

async fn set_cover_image_mysql(pool: &MySqlPool, id: Uuid, url: &str) -> Result<()> {
    sqlx::query("UPDATE events SET cover_image = ? WHERE id = ?")
        .bind(url)
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to set cover image")?;
    Ok(())
}

async fn delete_mysql(pool: &MySqlPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete event")?;
    Ok(())
}

fn row_to_event_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Event> {
    let id: String = row.get("id");
    let category_id: String = row.get("category_id");
    let event_type: String = row.get("event_type");
    let scope: String = row.get("scope");
    let status: String = row.get("status");

    Ok(Event {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid event id: {}", id))?,
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        location: row.get("location"),
        category_id: Uuid::parse_str(&category_id)
            .with_context(|| format!("Invalid category id: {}", category_id))?,
        event_type: EventType::from_str(&event_type)?,
        scope: EventScope::from_str(&scope)?,
        status: EventStatus::from_str(&status)?,
        cover_image: row.get("cover_image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, CategoryKind};
    use chrono::{Duration, Utc};

    async fn setup() -> (SqlxEventRepository, Category) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let categories = SqlxCategoryRepository::new(pool.clone());
        let category = Category::new(
            "Contests".into(),
            "contests".into(),
            None,
            CategoryKind::Event,
        );
        categories.create(&category).await.expect("Failed to create category");

        (SqlxEventRepository::new(pool), category)
    }

    fn sample_event(category_id: Uuid, slug: &str) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Anima Luanda 2026".to_string(),
            slug: slug.to_string(),
            description: Some("The biggest anime event".to_string()),
            start_at: now + Duration::days(60),
            end_at: Some(now + Duration::days(62)),
            location: Some("Talatona Convention Centre".to_string()),
            category_id,
            event_type: EventType::Contest,
            scope: EventScope::National,
            status: EventStatus::Published,
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_event() {
        let (repo, category) = setup().await;
        let event = sample_event(category.id, "anima-luanda-2026");

        repo.create(&event).await.expect("Failed to create");

        let loaded = repo
            .get_by_id(event.id)
            .await
            .expect("Failed to get")
            .expect("Not found");
        assert_eq!(loaded.title, event.title);
        assert_eq!(loaded.category_id, category.id);
        assert_eq!(loaded.event_type, EventType::Contest);
        assert_eq!(loaded.status, EventStatus::Published);
        assert!(loaded.end_at.is_some());
    }

    #[tokio::test]
    async fn test_list_all_preserves_insertion_order() {
        let (repo, category) = setup().await;
        for i in 0..5 {
            repo.create(&sample_event(category.id, &format!("event-{}", i)))
                .await
                .expect("Failed to create");
        }

        let events = repo.list_all().await.expect("Failed to list");
        assert_eq!(events.len(), 5);
        let slugs: Vec<&str> = events.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["event-0", "event-1", "event-2", "event-3", "event-4"]);
    }

    #[tokio::test]
    async fn test_update_event() {
        let (repo, category) = setup().await;
        let mut event = sample_event(category.id, "mutable");
        repo.create(&event).await.unwrap();

        event.title = "Renamed".to_string();
        event.status = EventStatus::Finalized;
        repo.update(&event).await.unwrap();

        let loaded = repo.get_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Renamed");
        assert_eq!(loaded.status, EventStatus::Finalized);
    }

    #[tokio::test]
    async fn test_set_cover_image() {
        let (repo, category) = setup().await;
        let event = sample_event(category.id, "with-cover");
        repo.create(&event).await.unwrap();

        repo.set_cover_image(event.id, "https://img.example/cover.jpg")
            .await
            .unwrap();

        let loaded = repo.get_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(
            loaded.cover_image.as_deref(),
            Some("https://img.example/cover.jpg")
        );
    }

    #[tokio::test]
    async fn test_delete_event() {
        let (repo, category) = setup().await;
        let event = sample_event(category.id, "doomed");
        repo.create(&event).await.unwrap();

        repo.delete(event.id).await.unwrap();
        assert!(repo.get_by_id(event.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_slug() {
        let (repo, category) = setup().await;
        assert!(!repo.exists_by_slug("taken").await.unwrap());

        repo.create(&sample_event(category.id, "taken")).await.unwrap();
        assert!(repo.exists_by_slug("taken").await.unwrap());
    }
}
