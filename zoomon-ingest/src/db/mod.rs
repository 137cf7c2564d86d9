//! Database access for zoomon-ingest

pub mod dimensions;
pub mod isolates;
pub mod prevalence;
pub mod resistance;
pub mod schema;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the service database, creating the file and parent
/// directories on first run, and applies the schema.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    schema::initialize_schema(&pool).await?;

    Ok(pool)
}
