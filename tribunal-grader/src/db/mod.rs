//! Database layer: pool initialization and per-table operations

pub mod artifacts;
pub mod events;
pub mod problems;
pub mod results;
pub mod schema;
pub mod submissions;
pub mod transcripts;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    schema::initialize_schema(&pool).await?;
    info!("Database ready at {}", db_path.display());

    Ok(pool)
}

/// In-memory pool for tests
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .foreign_keys(true);

    // A single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    schema::initialize_schema(&pool).await?;
    Ok(pool)
}
