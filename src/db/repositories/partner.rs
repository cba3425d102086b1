//! Partner repository
//!
//! Database operations for partners and the event/partner link table.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Partner, PartnerKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Partner repository trait
#[async_trait]
pub trait PartnerRepository: Send + Sync {
    /// Create a new partner
    async fn create(&self, partner: &Partner) -> Result<Partner>;

    /// Fetch the active partners among the given ids
    async fn get_active_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Partner>>;

    /// Partners credited on an event
    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Partner>>;

    /// Replace the partner links of an event
    async fn set_event_partners(&self, event_id: Uuid, partner_ids: &[Uuid]) -> Result<()>;
}

/// SQLx-based partner repository implementation
pub struct SqlxPartnerRepository {
    pool: DynDatabasePool,
}

impl SqlxPartnerRepository {
    /// Create a new SQLx partner repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PartnerRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PartnerRepository for SqlxPartnerRepository {
    async fn create(&self, partner: &Partner) -> Result<Partner> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), partner).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), partner).await,
        }
    }

    async fn get_active_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Partner>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_active_by_ids_sqlite(self.pool.as_sqlite().unwrap(), ids).await
            }
            DatabaseDriver::Mysql => {
                get_active_by_ids_mysql(self.pool.as_mysql().unwrap(), ids).await
            }
        }
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Partner>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_for_event_sqlite(self.pool.as_sqlite().unwrap(), event_id).await
            }
            DatabaseDriver::Mysql => {
                list_for_event_mysql(self.pool.as_mysql().unwrap(), event_id).await
            }
        }
    }

    async fn set_event_partners(&self, event_id: Uuid, partner_ids: &[Uuid]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_event_partners_sqlite(self.pool.as_sqlite().unwrap(), event_id, partner_ids)
                    .await
            }
            DatabaseDriver::Mysql => {
                set_event_partners_mysql(self.pool.as_mysql().unwrap(), event_id, partner_ids).await
            }
        }
    }
}

const PARTNER_COLUMNS: &str = "id, name, kind, logo_url, website, active, created_at";

fn id_placeholders(count: usize) -> String {
    std::iter::repeat("?").take(count).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, partner: &Partner) -> Result<Partner> {
    sqlx::query(
        r#"
        INSERT INTO partners (id, name, kind, logo_url, website, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(partner.id.to_string())
    .bind(&partner.name)
    .bind(partner.kind.as_str())
    .bind(&partner.logo_url)
    .bind(&partner.website)
    .bind(partner.active)
    .bind(partner.created_at)
    .execute(pool)
    .await
    .context("Failed to create partner")?;

    Ok(partner.clone())
}

async fn get_active_by_ids_sqlite(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Partner>> {
    let sql = format!(
        "SELECT {} FROM partners WHERE active = 1 AND id IN ({}) ORDER BY name",
        PARTNER_COLUMNS,
        id_placeholders(ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id.to_string());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load partners")?;
    rows.iter().map(row_to_partner_sqlite).collect()
}

async fn list_for_event_sqlite(pool: &SqlitePool, event_id: Uuid) -> Result<Vec<Partner>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM partners p
        INNER JOIN event_partners ep ON ep.partner_id = p.id
        WHERE ep.event_id = ?
        ORDER BY p.name
        "#,
        "p.id, p.name, p.kind, p.logo_url, p.website, p.active, p.created_at"
    ))
    .bind(event_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list event partners")?;

    rows.iter().map(row_to_partner_sqlite).collect()
}

async fn set_event_partners_sqlite(
    pool: &SqlitePool,
    event_id: Uuid,
    partner_ids: &[Uuid],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM event_partners WHERE event_id = ?")
        .bind(event_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to clear event partners")?;

    for partner_id in partner_ids {
        sqlx::query("INSERT INTO event_partners (event_id, partner_id) VALUES (?, ?)")
            .bind(event_id.to_string())
            .bind(partner_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to link event partner")?;
    }

    tx.commit().await.context("Failed to commit")?;
    Ok(())
}

fn row_to_partner_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Partner> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");

    Ok(Partner {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid partner id: {}", id))?,
        name: row.get("name"),
        kind: PartnerKind::from_str(&kind)?,
        logo_url: row.get("logo_url"),
        website: row.get("website"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, partner: &Partner) -> Result<Partner> {
    sqlx::query(
        r#"
        INSERT INTO partners (id, name, kind, logo_url, website, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(partner.id.to_string())
    .bind(&partner.name)
    .bind(partner.kind.as_str())
    .bind(&partner.logo_url)
    .bind(&partner.website)
    .bind(partner.active)
    .bind(partner.created_at)
    .execute(pool)
    .await
    .context("Failed to create partner")?;

    Ok(partner.clone())
}

async fn get_active_by_ids_mysql(pool: &MySqlPool, ids: &[Uuid]) -> Result<Vec<Partner>> {
    let sql = format!(
        "SELECT {} FROM partners WHERE active = 1 AND id IN ({}) ORDER BY name",
        PARTNER_COLUMNS,
        id_placeholders(ids.len())
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id.to_string());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load partners")?;
    rows.iter().map(row_to_partner_mysql).collect()
}

async fn list_for_event_mysql(pool: &MySqlPool, event_id: Uuid) -> Result<Vec<Partner>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM partners p
        INNER JOIN event_partners ep ON ep.partner_id = p.id
        WHERE ep.event_id = ?
        ORDER BY p.name
        "#,
        "p.id, p.name, p.kind, p.logo_url, p.website, p.active, p.created_at"
    ))
    .bind(event_id.to_string())
    .fetch_all(pool)
    .await
    .context("Failed to list event partners")?;

    rows.iter().map(row_to_partner_mysql).collect()
}

async fn set_event_partners_mysql(
    pool: &MySqlPool,
    event_id: Uuid,
    partner_ids: &[Uuid],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM event_partners WHERE event_id = ?")
        .bind(event_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to clear event partners")?;

    for partner_id in partner_ids {
        sqlx::query("INSERT INTO event_partners (event_id, partner_id) VALUES (?, ?)")
            .bind(event_id.to_string())
            .bind(partner_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to link event partner")?;
    }

    tx.commit().await.context("Failed to commit")?;
    Ok(())
}

fn row_to_partner_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Partner> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");

    Ok(Partner {
        id: Uuid::parse_str(&id).with_context(|| format!("Invalid partner id: {}", id))?,
        name: row.get("name"),
        kind: PartnerKind::from_str(&kind)?,
        logo_url: row.get("logo_url"),
        website: row.get("website"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CategoryRepository, EventRepository, SqlxCategoryRepository, SqlxEventRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, CategoryKind, Event, EventScope, EventStatus, EventType};
    use chrono::{Duration, Utc};

    async fn setup() -> (SqlxPartnerRepository, Event) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let categories = SqlxCategoryRepository::new(pool.clone());
        let category = Category::new("Contests".into(), "contests".into(), None, CategoryKind::Event);
        categories.create(&category).await.unwrap();

        let events = SqlxEventRepository::new(pool.clone());
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: "Con".into(),
            slug: "con".into(),
            description: None,
            start_at: now + Duration::days(10),
            end_at: None,
            location: None,
            category_id: category.id,
            event_type: EventType::Contest,
            scope: EventScope::National,
            status: EventStatus::Published,
            cover_image: None,
            created_at: now,
            updated_at: now,
        };
        events.create(&event).await.unwrap();

        (SqlxPartnerRepository::new(pool), event)
    }

    #[tokio::test]
    async fn test_get_active_by_ids_skips_inactive() {
        let (repo, _event) = setup().await;

        let active = Partner::new("Active Co".into(), PartnerKind::Sponsor);
        let mut inactive = Partner::new("Gone Co".into(), PartnerKind::Media);
        inactive.active = false;

        repo.create(&active).await.unwrap();
        repo.create(&inactive).await.unwrap();

        let found = repo
            .get_active_by_ids(&[active.id, inactive.id])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active.id);
    }

    #[tokio::test]
    async fn test_get_active_by_ids_empty_input() {
        let (repo, _event) = setup().await;
        assert!(repo.get_active_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_and_list_event_partners() {
        let (repo, event) = setup().await;

        let a = Partner::new("Anime Store".into(), PartnerKind::Sponsor);
        let b = Partner::new("Radio FM".into(), PartnerKind::Media);
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        repo.set_event_partners(event.id, &[a.id, b.id]).await.unwrap();
        let linked = repo.list_for_event(event.id).await.unwrap();
        assert_eq!(linked.len(), 2);

        // Replacing the set drops stale links
        repo.set_event_partners(event.id, &[b.id]).await.unwrap();
        let linked = repo.list_for_event(event.id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, b.id);
    }
}
