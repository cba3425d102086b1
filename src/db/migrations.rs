//! Database migrations module
//!
//! Code-based database migrations for the Cosplayhub backend. All migrations
//! are embedded directly in Rust code as SQL strings, supporting both SQLite
//! and MySQL databases for single-binary deployment.
//!
//! Each migration is defined as a `Migration` struct containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_sqlite`: SQL for SQLite
//! - `up_mysql`: SQL for MySQL

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations for the Cosplayhub backend, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    // Migration 1: Create users table
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                is_staff INTEGER NOT NULL DEFAULT 0,
                is_superuser INTEGER NOT NULL DEFAULT 0,
                last_login TIMESTAMP,
                date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                is_staff TINYINT NOT NULL DEFAULT 0,
                is_superuser TINYINT NOT NULL DEFAULT 0,
                last_login TIMESTAMP NULL,
                date_joined TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_username ON users(username);
            CREATE INDEX idx_users_email ON users(email);
        "#,
    },
    // Migration 2: Create token blacklist table.
    // The primary key on jti makes check-and-insert atomic, which is what
    // keeps refresh tokens single-use under concurrent requests.
    Migration {
        version: 2,
        name: "create_token_blacklist",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS token_blacklist (
                jti VARCHAR(36) PRIMARY KEY,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_token_blacklist_expires_at ON token_blacklist(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS token_blacklist (
                jti VARCHAR(36) PRIMARY KEY,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_token_blacklist_expires_at ON token_blacklist(expires_at);
        "#,
    },
    // Migration 3: Create categories table
    Migration {
        version: 3,
        name: "create_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(250) NOT NULL UNIQUE,
                description TEXT,
                kind VARCHAR(20) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_categories_slug ON categories(slug);
            CREATE INDEX IF NOT EXISTS idx_categories_kind ON categories(kind);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(250) NOT NULL UNIQUE,
                description TEXT,
                kind VARCHAR(20) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_categories_slug ON categories(slug);
            CREATE INDEX idx_categories_kind ON categories(kind);
        "#,
    },
    // Migration 4: Create events table.
    // category_id has no ON DELETE action: deleting a referenced category is
    // rejected (protect-on-delete).
    Migration {
        version: 4,
        name: "create_events",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS events (
                id VARCHAR(36) PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(250) NOT NULL UNIQUE,
                description TEXT,
                start_at TIMESTAMP NOT NULL,
                end_at TIMESTAMP,
                location VARCHAR(200),
                category_id VARCHAR(36) NOT NULL,
                event_type VARCHAR(20) NOT NULL,
                scope VARCHAR(20) NOT NULL DEFAULT 'national',
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                cover_image VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );
            CREATE INDEX IF NOT EXISTS idx_events_slug ON events(slug);
            CREATE INDEX IF NOT EXISTS idx_events_start_at ON events(start_at);
            CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS events (
                id VARCHAR(36) PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(250) NOT NULL UNIQUE,
                description TEXT,
                start_at TIMESTAMP NOT NULL,
                end_at TIMESTAMP NULL,
                location VARCHAR(200),
                category_id VARCHAR(36) NOT NULL,
                event_type VARCHAR(20) NOT NULL,
                scope VARCHAR(20) NOT NULL DEFAULT 'national',
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                cover_image VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );
            CREATE INDEX idx_events_slug ON events(slug);
            CREATE INDEX idx_events_start_at ON events(start_at);
            CREATE INDEX idx_events_status ON events(status);
        "#,
    },
    // Migration 5: Create partners table
    Migration {
        version: 5,
        name: "create_partners",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS partners (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(150) NOT NULL,
                kind VARCHAR(20) NOT NULL,
                logo_url VARCHAR(500),
                website VARCHAR(200),
                active INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_partners_kind ON partners(kind);
            CREATE INDEX IF NOT EXISTS idx_partners_active ON partners(active);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS partners (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(150) NOT NULL,
                kind VARCHAR(20) NOT NULL,
                logo_url VARCHAR(500),
                website VARCHAR(200),
                active TINYINT NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_partners_kind ON partners(kind);
            CREATE INDEX idx_partners_active ON partners(active);
        "#,
    },
    // Migration 6: Create event/partner join table
    Migration {
        version: 6,
        name: "create_event_partners",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS event_partners (
                event_id VARCHAR(36) NOT NULL,
                partner_id VARCHAR(36) NOT NULL,
                PRIMARY KEY (event_id, partner_id),
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
                FOREIGN KEY (partner_id) REFERENCES partners(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_event_partners_partner_id ON event_partners(partner_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS event_partners (
                event_id VARCHAR(36) NOT NULL,
                partner_id VARCHAR(36) NOT NULL,
                PRIMARY KEY (event_id, partner_id),
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
                FOREIGN KEY (partner_id) REFERENCES partners(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_event_partners_partner_id ON event_partners(partner_id);
        "#,
    },
];

/// Run all pending migrations.
///
/// Creates the migrations tracking table if needed, checks which migrations
/// have already been applied, and runs any pending migrations in order.
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    name VARCHAR(255) NOT NULL UNIQUE,
                    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            )
            .execute(pool.as_sqlite().unwrap())
            .await
            .context("Failed to create migrations table")?;
        }
        DatabaseDriver::Mysql => {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS _migrations (
                    version INT PRIMARY KEY,
                    name VARCHAR(255) NOT NULL UNIQUE,
                    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            )
            .execute(pool.as_mysql().unwrap())
            .await
            .context("Failed to create migrations table")?;
        }
    }
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    let query = "SELECT version, name, applied_at FROM _migrations ORDER BY version";
    let mut records = Vec::new();

    match pool.driver() {
        DatabaseDriver::Sqlite => {
            let rows = sqlx::query(query)
                .fetch_all(pool.as_sqlite().unwrap())
                .await?;
            for row in rows {
                records.push(MigrationRecord {
                    version: row.get("version"),
                    name: row.get("name"),
                    applied_at: row.get("applied_at"),
                });
            }
        }
        DatabaseDriver::Mysql => {
            let rows = sqlx::query(query)
                .fetch_all(pool.as_mysql().unwrap())
                .await?;
            for row in rows {
                records.push(MigrationRecord {
                    version: row.get("version"),
                    name: row.get("name"),
                    applied_at: row.get("applied_at"),
                });
            }
        }
    }

    Ok(records)
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.as_sqlite().unwrap(), migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.as_mysql().unwrap(), migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    if sql.len() > 100 {
        format!("{}...", &sql[..100])
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual statements, handling comments properly
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    for line in s.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("--") {
            return false;
        }
    }
    true
}
