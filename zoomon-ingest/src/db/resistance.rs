//! Resistance fact persistence
//!
//! Bilingual fact table: an English row is canonical, a German counterpart
//! shares its `document_id`. Upsert is keyed by (`db_id`, `locale`) and is
//! gated by the source row's modified flag, so unchanged rows of this
//! large, rarely-refreshed data set are not rewritten on every run.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// One antimicrobial-resistance fact record in one locale
#[derive(Debug, Clone)]
pub struct ResistanceRecord {
    pub db_id: String,
    pub locale: String,
    pub document_id: String,
    pub sampling_year: Option<i64>,
    pub substance: Option<String>,
    pub tested_count: Option<i64>,
    pub resistant_count: Option<i64>,
    pub resistance_rate: Option<f64>,
    pub microorganism_id: Option<i64>,
    pub matrix_id: Option<i64>,
    pub animal_species_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of a resistance upsert
#[derive(Debug, Clone)]
pub struct Upserted {
    pub id: i64,
    /// Authoritative document id: the stored one on a match, the record's
    /// own on a fresh insert
    pub document_id: String,
}

/// Insert-or-update by (business id, locale)
///
/// On a match the row is only rewritten when `update_allowed` is set (the
/// source row carried the modified flag); the stored `document_id` is kept
/// either way so localization links survive updates.
pub async fn upsert(
    pool: &SqlitePool,
    record: &ResistanceRecord,
    update_allowed: bool,
) -> Result<Upserted> {
    let existing = sqlx::query("SELECT id, document_id FROM resistance WHERE db_id = ? AND locale = ?")
        .bind(&record.db_id)
        .bind(&record.locale)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(row) => {
            let id: i64 = row.get("id");
            let document_id: String = row.get("document_id");
            if update_allowed {
                sqlx::query(
                    r#"
                    UPDATE resistance SET
                        sampling_year = ?, substance = ?, tested_count = ?,
                        resistant_count = ?, resistance_rate = ?,
                        microorganism_id = ?, matrix_id = ?, animal_species_id = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(record.sampling_year)
                .bind(&record.substance)
                .bind(record.tested_count)
                .bind(record.resistant_count)
                .bind(record.resistance_rate)
                .bind(record.microorganism_id)
                .bind(record.matrix_id)
                .bind(record.animal_species_id)
                .bind(&record.updated_at)
                .bind(id)
                .execute(pool)
                .await?;
            }
            Ok(Upserted { id, document_id })
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO resistance (
                    db_id, locale, document_id, sampling_year, substance,
                    tested_count, resistant_count, resistance_rate,
                    microorganism_id, matrix_id, animal_species_id,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.db_id)
            .bind(&record.locale)
            .bind(&record.document_id)
            .bind(record.sampling_year)
            .bind(&record.substance)
            .bind(record.tested_count)
            .bind(record.resistant_count)
            .bind(record.resistance_rate)
            .bind(record.microorganism_id)
            .bind(record.matrix_id)
            .bind(record.animal_species_id)
            .bind(&record.created_at)
            .bind(&record.updated_at)
            .execute(pool)
            .await?;
            Ok(Upserted {
                id: result.last_insert_rowid(),
                document_id: record.document_id.clone(),
            })
        }
    }
}

/// Total number of persisted resistance rows, all locales
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM resistance")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}
