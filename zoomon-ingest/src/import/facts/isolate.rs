//! Isolate row transformer
//!
//! Lenient fact kind: unresolved dimension values leave the foreign key
//! null and the row is still imported.

use super::{field, opt_string, parse_year, TransformedFact};
use crate::db::dimensions::Category;
use crate::db::isolates::Isolate;
use crate::import::dimensions::{DimensionCache, DimensionColumn};
use std::collections::HashMap;
use tracing::warn;

/// Dimension lookup columns of the isolate sheet
pub const DIMENSION_COLUMNS: &[DimensionColumn] = &[
    DimensionColumn {
        category: Category::Microorganism,
        column: "Microorganism",
        column_de: None,
    },
    DimensionColumn {
        category: Category::Matrix,
        column: "Matrix",
        column_de: None,
    },
    DimensionColumn {
        category: Category::SamplingStage,
        column: "Sampling_stage",
        column_de: None,
    },
    DimensionColumn {
        category: Category::SamplingContext,
        column: "Sampling_context",
        column_de: None,
    },
    DimensionColumn {
        category: Category::SampleType,
        column: "Sample_type",
        column_de: None,
    },
    DimensionColumn {
        category: Category::AnimalSpecies,
        column: "Animal_species",
        column_de: None,
    },
];

/// Categories the isolate importer loads into its cache
pub const CATEGORIES: &[Category] = &[
    Category::Microorganism,
    Category::Matrix,
    Category::SamplingStage,
    Category::SamplingContext,
    Category::SampleType,
    Category::AnimalSpecies,
];

/// Transform one normalized row. Returns None for rows with a blank
/// business id (section headers/footers, dropped by design).
pub fn transform(
    row: &HashMap<String, String>,
    cache: &DimensionCache,
    now: &str,
) -> Option<TransformedFact<Isolate>> {
    let db_id = field(row, "DB_ID").trim();
    if db_id.is_empty() {
        return None;
    }

    let mut unresolved = Vec::new();
    let mut resolve = |lookup: &DimensionColumn| -> Option<i64> {
        let raw = field(row, lookup.column).trim();
        if raw.is_empty() {
            return None;
        }
        match cache.resolve(lookup.category, raw) {
            Some(id) => Some(id),
            None => {
                warn!(db_id, category = %lookup.category, value = raw, "Unresolved dimension value");
                unresolved.push((lookup.category, raw.to_string()));
                None
            }
        }
    };

    let fact = Isolate {
        db_id: db_id.to_string(),
        sampling_year: parse_year(row, "Year"),
        microorganism_id: resolve(&DIMENSION_COLUMNS[0]),
        matrix_id: resolve(&DIMENSION_COLUMNS[1]),
        sampling_stage_id: resolve(&DIMENSION_COLUMNS[2]),
        sampling_context_id: resolve(&DIMENSION_COLUMNS[3]),
        sample_type_id: resolve(&DIMENSION_COLUMNS[4]),
        animal_species_id: resolve(&DIMENSION_COLUMNS[5]),
        federal_state: opt_string(row, "Federal_state"),
        sampling_reason: opt_string(row, "Sampling_reason"),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };

    Some(TransformedFact { fact, unresolved })
}
