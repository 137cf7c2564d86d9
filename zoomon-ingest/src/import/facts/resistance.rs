//! Resistance row transformer
//!
//! Strict bilingual fact kind: the sheet carries English and German names
//! for the localized dimensions, the transformer emits an English record
//! plus an optional German counterpart, and unresolved English dimension
//! values reject the row under the default policy.

use super::{field, opt_string, parse_f64, parse_i64, parse_year, truthy_flag};
use crate::db::dimensions::Category;
use crate::db::resistance::ResistanceRecord;
use crate::import::dimensions::{DimensionCache, DimensionColumn};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Dimension lookup columns of the resistance sheet
pub const DIMENSION_COLUMNS: &[DimensionColumn] = &[
    DimensionColumn {
        category: Category::Microorganism,
        column: "Microorganism",
        column_de: None,
    },
    DimensionColumn {
        category: Category::Matrix,
        column: "Matrix",
        column_de: Some("Matrix_de"),
    },
    DimensionColumn {
        category: Category::AnimalSpecies,
        column: "Animal_species",
        column_de: Some("Animal_species_de"),
    },
];

/// Categories the resistance importer loads into its cache
pub const CATEGORIES: &[Category] = &[
    Category::Microorganism,
    Category::Matrix,
    Category::AnimalSpecies,
];

/// English record, optional German counterpart, and the modified-flag
/// gate for the upsert engine
#[derive(Debug, Clone)]
pub struct TransformedResistance {
    pub en: ResistanceRecord,
    /// German counterpart; its `document_id` is replaced by the stored
    /// English one at upsert time
    pub de: Option<ResistanceRecord>,
    pub update_allowed: bool,
    pub unresolved: Vec<(Category, String)>,
}

/// Transform one normalized row. Returns None for rows with a blank
/// business id.
pub fn transform(
    row: &HashMap<String, String>,
    cache: &DimensionCache,
    now: &str,
) -> Option<TransformedResistance> {
    let db_id = field(row, "DB_ID").trim();
    if db_id.is_empty() {
        return None;
    }

    let mut unresolved = Vec::new();
    let mut resolve_en = |category: Category, key: &str| -> Option<i64> {
        let raw = field(row, key).trim();
        if raw.is_empty() {
            return None;
        }
        match cache.resolve(category, raw) {
            Some(id) => Some(id),
            None => {
                warn!(db_id, category = %category, value = raw, "Unresolved dimension value");
                unresolved.push((category, raw.to_string()));
                None
            }
        }
    };

    let microorganism_id = resolve_en(Category::Microorganism, "Microorganism");
    let matrix_id = resolve_en(Category::Matrix, "Matrix");
    let animal_species_id = resolve_en(Category::AnimalSpecies, "Animal_species");

    let en = ResistanceRecord {
        db_id: db_id.to_string(),
        locale: "en".to_string(),
        document_id: Uuid::new_v4().to_string(),
        sampling_year: parse_year(row, "Year"),
        substance: opt_string(row, "Substance"),
        tested_count: parse_i64(row, "Tested"),
        resistant_count: parse_i64(row, "Resistant"),
        resistance_rate: parse_f64(row, "Resistance_rate"),
        microorganism_id,
        matrix_id,
        animal_species_id,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };

    // German counterpart only when the sheet supplies German names; its
    // localized FKs point at the 'de' dimension rows
    let matrix_de = field(row, "Matrix_de").trim();
    let animal_species_de = field(row, "Animal_species_de").trim();
    let de = (!matrix_de.is_empty() || !animal_species_de.is_empty()).then(|| {
        let resolve_de = |category: Category, raw: &str| -> Option<i64> {
            if raw.is_empty() {
                return None;
            }
            let id = cache.resolve_locale(category, raw, "de");
            if id.is_none() {
                warn!(db_id, category = %category, value = raw, "Unresolved German dimension value");
            }
            id
        };
        ResistanceRecord {
            locale: "de".to_string(),
            matrix_id: resolve_de(Category::Matrix, matrix_de),
            animal_species_id: resolve_de(Category::AnimalSpecies, animal_species_de),
            ..en.clone()
        }
    });

    Some(TransformedResistance {
        en,
        de,
        update_allowed: truthy_flag(field(row, "Modified")),
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::localize;
    use sqlx::SqlitePool;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_bilingual_transform() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::schema::initialize_schema(&pool).await.unwrap();
        localize::link_or_create(&pool, Category::Matrix, "Pig meat", Some("Schweinefleisch"))
            .await
            .unwrap();
        let cache = crate::import::dimensions::DimensionCache::load(&pool, CATEGORIES)
            .await
            .unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        let transformed = transform(
            &row(&[
                ("DB_ID", "RES-1"),
                ("Modified", "x"),
                ("Year", "2020"),
                ("Microorganism", "E. coli"),
                ("Substance", "Ampicillin"),
                ("Matrix", "Pig meat"),
                ("Matrix_de", "Schweinefleisch"),
                ("Tested", "170"),
                ("Resistant", "42"),
                ("Resistance_rate", "24,7"),
            ]),
            &cache,
            &now,
        )
        .expect("row dropped");

        assert!(transformed.update_allowed);
        assert!(transformed.en.matrix_id.is_some());
        assert_eq!(transformed.en.resistance_rate, Some(24.7));
        // Unknown microorganism is reported for the strict policy
        assert_eq!(
            transformed.unresolved,
            vec![(Category::Microorganism, "E. coli".to_string())]
        );

        let de = transformed.de.expect("missing German counterpart");
        assert_eq!(de.locale, "de");
        assert!(de.matrix_id.is_some());
        assert_ne!(de.matrix_id, transformed.en.matrix_id);
    }

    #[tokio::test]
    async fn test_monolingual_row_has_no_counterpart() {
        let cache = crate::import::dimensions::DimensionCache::default();
        let now = chrono::Utc::now().to_rfc3339();
        let transformed = transform(
            &row(&[("DB_ID", "RES-2"), ("Year", "2020")]),
            &cache,
            &now,
        )
        .expect("row dropped");
        assert!(transformed.de.is_none());
        assert!(!transformed.update_allowed);
    }
}
