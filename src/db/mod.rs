//! Database layer
//!
//! Database abstraction for the Cosplayhub backend. Supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration. Repositories are defined as
//! traits with sqlx-backed implementations so services stay storage-agnostic.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
