//! Database layer
//!
//! Supports:
//! - SQLite (default, for single-file deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration. Repositories hold a
//! `DynDatabasePool` and dispatch on the concrete backend; most statements are
//! shared between drivers and written once through [`with_pool!`].
//!
//! # Usage
//!
//! ```ignore
//! use skynote::config::DatabaseConfig;
//! use skynote::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

/// Run the same sqlx expression against whichever backend the pool wraps.
///
/// The body is expanded once per driver with `$conn` bound to a `&SqlitePool`
/// or a `&MySqlPool`, so it must type-check against both.
macro_rules! with_pool {
    ($pool:expr, $conn:ident => $body:expr) => {
        match $pool.backend() {
            $crate::db::Backend::Sqlite($conn) => $body,
            $crate::db::Backend::Mysql($conn) => $body,
        }
    };
}

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, InsertId,
    MysqlDatabase, SqliteDatabase,
};
