//! Prevalence fact persistence
//!
//! Small, frequently-refreshed statistics: upsert keyed by `db_id`,
//! always updated on a match.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// One prevalence statistic fact record
#[derive(Debug, Clone)]
pub struct PrevalenceRecord {
    pub db_id: String,
    pub sampling_year: Option<i64>,
    pub n_samples: Option<i64>,
    pub n_positive: Option<i64>,
    pub percentage_positive: Option<f64>,
    pub ci_min: Option<f64>,
    pub ci_max: Option<f64>,
    pub microorganism_id: Option<i64>,
    pub matrix_id: Option<i64>,
    pub sampling_stage_id: Option<i64>,
    pub sample_origin_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Insert-or-update by business id, returning the persisted row id
pub async fn upsert(pool: &SqlitePool, record: &PrevalenceRecord) -> Result<i64> {
    let existing = sqlx::query("SELECT id FROM prevalence WHERE db_id = ?")
        .bind(&record.db_id)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(row) => {
            let id: i64 = row.get("id");
            sqlx::query(
                r#"
                UPDATE prevalence SET
                    sampling_year = ?, n_samples = ?, n_positive = ?,
                    percentage_positive = ?, ci_min = ?, ci_max = ?,
                    microorganism_id = ?, matrix_id = ?, sampling_stage_id = ?,
                    sample_origin_id = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(record.sampling_year)
            .bind(record.n_samples)
            .bind(record.n_positive)
            .bind(record.percentage_positive)
            .bind(record.ci_min)
            .bind(record.ci_max)
            .bind(record.microorganism_id)
            .bind(record.matrix_id)
            .bind(record.sampling_stage_id)
            .bind(record.sample_origin_id)
            .bind(&record.updated_at)
            .bind(id)
            .execute(pool)
            .await?;
            Ok(id)
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO prevalence (
                    db_id, sampling_year, n_samples, n_positive,
                    percentage_positive, ci_min, ci_max,
                    microorganism_id, matrix_id, sampling_stage_id,
                    sample_origin_id, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.db_id)
            .bind(record.sampling_year)
            .bind(record.n_samples)
            .bind(record.n_positive)
            .bind(record.percentage_positive)
            .bind(record.ci_min)
            .bind(record.ci_max)
            .bind(record.microorganism_id)
            .bind(record.matrix_id)
            .bind(record.sampling_stage_id)
            .bind(record.sample_origin_id)
            .bind(&record.created_at)
            .bind(&record.updated_at)
            .execute(pool)
            .await?;
            Ok(result.last_insert_rowid())
        }
    }
}

/// Total number of persisted prevalence rows
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM prevalence")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(db_id: &str) -> PrevalenceRecord {
        let now = chrono::Utc::now().to_rfc3339();
        PrevalenceRecord {
            db_id: db_id.to_string(),
            sampling_year: Some(2019),
            n_samples: Some(400),
            n_positive: Some(36),
            percentage_positive: Some(9.0),
            ci_min: Some(6.5),
            ci_max: Some(12.2),
            microorganism_id: Some(2),
            matrix_id: None,
            sampling_stage_id: None,
            sample_origin_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_always_updates() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::schema::initialize_schema(&pool).await.unwrap();

        let first = upsert(&pool, &sample("PREV-1")).await.unwrap();

        let mut changed = sample("PREV-1");
        changed.n_positive = Some(40);
        let second = upsert(&pool, &changed).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&pool).await.unwrap(), 1);
        let stored: i64 = sqlx::query("SELECT n_positive FROM prevalence WHERE id = ?")
            .bind(first)
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n_positive");
        assert_eq!(stored, 40);
    }
}
