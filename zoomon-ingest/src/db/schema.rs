//! Schema initialization for zoomon-ingest
//!
//! One dimension table shared by every controlled-vocabulary category, and
//! one fact table per fact kind. All statements are idempotent; the schema
//! is applied at every startup.
//!
//! `locale` is stored as '' for locale-less records so the uniqueness
//! constraint holds (SQLite treats NULLs as distinct inside UNIQUE).

use anyhow::Result;
use sqlx::SqlitePool;

/// Create all tables and indexes if they do not exist
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dimensions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            name TEXT NOT NULL,
            token TEXT,
            locale TEXT NOT NULL DEFAULT '',
            document_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(category, name, locale)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_dimensions_document
        ON dimensions (category, document_id, locale)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS isolates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            db_id TEXT NOT NULL UNIQUE,
            sampling_year INTEGER,
            microorganism_id INTEGER,
            matrix_id INTEGER,
            sampling_stage_id INTEGER,
            sampling_context_id INTEGER,
            sample_type_id INTEGER,
            animal_species_id INTEGER,
            federal_state TEXT,
            sampling_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resistance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            db_id TEXT NOT NULL,
            locale TEXT NOT NULL DEFAULT 'en',
            document_id TEXT NOT NULL,
            sampling_year INTEGER,
            substance TEXT,
            tested_count INTEGER,
            resistant_count INTEGER,
            resistance_rate REAL,
            microorganism_id INTEGER,
            matrix_id INTEGER,
            animal_species_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(db_id, locale)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prevalence (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            db_id TEXT NOT NULL UNIQUE,
            sampling_year INTEGER,
            n_samples INTEGER,
            n_positive INTEGER,
            percentage_positive REAL,
            ci_min REAL,
            ci_max REAL,
            microorganism_id INTEGER,
            matrix_id INTEGER,
            sampling_stage_id INTEGER,
            sample_origin_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (dimensions, isolates, resistance, prevalence)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        initialize_schema(&pool).await.expect("First apply failed");
        initialize_schema(&pool).await.expect("Second apply failed");
    }
}
