//! Category repository
//!
//! Database operations for categories. Deletion is the caller's concern to
//! guard: `event_count` reports how many events still reference a category
//! so the service layer can enforce protect-on-delete.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List categories, optionally restricted to one kind
    async fn list(&self, kind: Option<CategoryKind>) -> Result<Vec<Category>>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Number of events referencing the category
    async fn event_count(&self, id: Uuid) -> Result<i64>;

    /// Delete a category
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), category).await,
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => get_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }

    async fn list(&self, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), kind).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), kind).await,
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

    async fn event_count(&self, id: Uuid) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => event_count_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => event_count_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, kind, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        INSERT INTO categories (id, name, slug, description, kind, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(category.id.to_string())
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.kind.as_str())
    .bind(category.created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(category.clone())
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: Uuid) -> Result<Option<Category>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE id = ?",
        CATEGORY_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.map(|row| row_to_category_sqlite(&row)).transpose()
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE slug = ?",
        CATEGORY_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    row.map(|row| row_to_category_sqlite(&row)).transpose()
}

async fn list_sqlite(pool: &SqlitePool, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
    let rows = match kind {
        Some(kind) => {
            sqlx::query(&format!(
                "SELECT {} FROM categories WHERE kind = ? ORDER BY name",
                CATEGORY_COLUMNS
            ))
            .bind(kind.as_str())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM categories ORDER BY name",
                CATEGORY_COLUMNS
            ))
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check category slug")?;
    Ok(count > 0)
}

async fn event_count_sqlite(pool: &SqlitePool, id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE category_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count referencing events")?;
    Ok(count)
}

async fn delete_sqlite(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");

    Ok(Category {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid category id: {}", id))?,
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        kind: CategoryKind::from_str(&kind)?,
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query(
        r#"
        INSERT INTO categories (id, name, slug, description, kind, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(category.id.to_string())
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.kind.as_str())
    .bind(category.created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(category.clone())
}

async fn get_by_id_mysql(pool: &MySqlPool, id: Uuid) -> Result<Option<Category>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE id = ?",
        CATEGORY_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.map(|row| row_to_category_mysql(&row)).transpose()
}

async fn get_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE slug = ?",
        CATEGORY_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    row.map(|row| row_to_category_mysql(&row)).transpose()
}

async fn list_mysql(pool: &MySqlPool, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
    let rows = match kind {
        Some(kind) => {
            sqlx::query(&format!(
                "SELECT {} FROM categories WHERE kind = ? ORDER BY name",
                CATEGORY_COLUMNS
            ))
            .bind(kind.as_str())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM categories ORDER BY name",
                CATEGORY_COLUMNS
            ))
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check category slug")?;
    Ok(count > 0)
}

async fn event_count_mysql(pool: &MySqlPool, id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE category_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await
        .context("Failed to count referencing events")?;
    Ok(count)
}

async fn delete_mysql(pool: &MySqlPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");

    Ok(Category {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid category id: {}", id))?,
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        kind: CategoryKind::from_str(&kind)?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let repo = setup_test_repo().await;
        let category = Category::new(
            "Cosplay Contest".into(),
            "cosplay-contest".into(),
            Some("Competitions".into()),
            CategoryKind::Event,
        );

        repo.create(&category).await.expect("Failed to create");

        let by_id = repo
            .get_by_id(category.id)
            .await
            .expect("Failed to get")
            .expect("Not found");
        assert_eq!(by_id.name, "Cosplay Contest");
        assert_eq!(by_id.kind, CategoryKind::Event);

        let by_slug = repo
            .get_by_slug("cosplay-contest")
            .await
            .expect("Failed to get")
            .expect("Not found");
        assert_eq!(by_slug.id, category.id);
    }

    #[tokio::test]
    async fn test_list_filters_by_kind() {
        let repo = setup_test_repo().await;
        repo.create(&Category::new(
            "Contests".into(),
            "contests".into(),
            None,
            CategoryKind::Event,
        ))
        .await
        .unwrap();
        repo.create(&Category::new(
            "Armor Builds".into(),
            "armor-builds".into(),
            None,
            CategoryKind::Collection,
        ))
        .await
        .unwrap();

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let events_only = repo.list(Some(CategoryKind::Event)).await.unwrap();
        assert_eq!(events_only.len(), 1);
        assert_eq!(events_only[0].slug, "contests");
    }

    #[tokio::test]
    async fn test_exists_by_slug() {
        let repo = setup_test_repo().await;
        assert!(!repo.exists_by_slug("workshops").await.unwrap());

        repo.create(&Category::new(
            "Workshops".into(),
            "workshops".into(),
            None,
            CategoryKind::Event,
        ))
        .await
        .unwrap();

        assert!(repo.exists_by_slug("workshops").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_category() {
        let repo = setup_test_repo().await;
        let category = Category::new("Tmp".into(), "tmp".into(), None, CategoryKind::Event);
        repo.create(&category).await.unwrap();

        repo.delete(category.id).await.unwrap();
        assert!(repo.get_by_id(category.id).await.unwrap().is_none());
    }
}
