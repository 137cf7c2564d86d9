//! Isolate fact persistence
//!
//! Upsert keyed by the spreadsheet business id (`db_id`); an isolate row
//! is always updated when the key matches.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// One microbial isolate fact record
#[derive(Debug, Clone)]
pub struct Isolate {
    pub db_id: String,
    pub sampling_year: Option<i64>,
    pub microorganism_id: Option<i64>,
    pub matrix_id: Option<i64>,
    pub sampling_stage_id: Option<i64>,
    pub sampling_context_id: Option<i64>,
    pub sample_type_id: Option<i64>,
    pub animal_species_id: Option<i64>,
    pub federal_state: Option<String>,
    pub sampling_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Find the persisted row id for a business id
pub async fn find_id_by_db_id(pool: &SqlitePool, db_id: &str) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT id FROM isolates WHERE db_id = ?")
        .bind(db_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("id")))
}

/// Insert-or-update by business id, returning the persisted row id
pub async fn upsert(pool: &SqlitePool, isolate: &Isolate) -> Result<i64> {
    match find_id_by_db_id(pool, &isolate.db_id).await? {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE isolates SET
                    sampling_year = ?, microorganism_id = ?, matrix_id = ?,
                    sampling_stage_id = ?, sampling_context_id = ?, sample_type_id = ?,
                    animal_species_id = ?, federal_state = ?, sampling_reason = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(isolate.sampling_year)
            .bind(isolate.microorganism_id)
            .bind(isolate.matrix_id)
            .bind(isolate.sampling_stage_id)
            .bind(isolate.sampling_context_id)
            .bind(isolate.sample_type_id)
            .bind(isolate.animal_species_id)
            .bind(&isolate.federal_state)
            .bind(&isolate.sampling_reason)
            .bind(&isolate.updated_at)
            .bind(id)
            .execute(pool)
            .await?;
            Ok(id)
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO isolates (
                    db_id, sampling_year, microorganism_id, matrix_id,
                    sampling_stage_id, sampling_context_id, sample_type_id,
                    animal_species_id, federal_state, sampling_reason,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&isolate.db_id)
            .bind(isolate.sampling_year)
            .bind(isolate.microorganism_id)
            .bind(isolate.matrix_id)
            .bind(isolate.sampling_stage_id)
            .bind(isolate.sampling_context_id)
            .bind(isolate.sample_type_id)
            .bind(isolate.animal_species_id)
            .bind(&isolate.federal_state)
            .bind(&isolate.sampling_reason)
            .bind(&isolate.created_at)
            .bind(&isolate.updated_at)
            .execute(pool)
            .await?;
            Ok(result.last_insert_rowid())
        }
    }
}

/// Total number of persisted isolates
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM isolates")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(db_id: &str) -> Isolate {
        let now = chrono::Utc::now().to_rfc3339();
        Isolate {
            db_id: db_id.to_string(),
            sampling_year: Some(2021),
            microorganism_id: Some(1),
            matrix_id: None,
            sampling_stage_id: None,
            sampling_context_id: None,
            sample_type_id: None,
            animal_species_id: None,
            federal_state: Some("Brandenburg".to_string()),
            sampling_reason: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::schema::initialize_schema(&pool).await.unwrap();

        let first = upsert(&pool, &sample("ZN-100")).await.unwrap();

        let mut changed = sample("ZN-100");
        changed.sampling_year = Some(2022);
        let second = upsert(&pool, &changed).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&pool).await.unwrap(), 1);

        let year: i64 = sqlx::query("SELECT sampling_year FROM isolates WHERE db_id = 'ZN-100'")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("sampling_year");
        assert_eq!(year, 2022);
    }
}
