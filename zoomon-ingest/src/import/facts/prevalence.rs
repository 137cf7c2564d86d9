//! Prevalence row transformer
//!
//! Lenient fact kind with bilingual dimensions: matrix names arrive in
//! English and German, the sample origin is an ontology token, and missing
//! confidence-interval bounds are computed from the counts.

use super::{field, parse_f64, parse_i64, parse_year, wilson_interval, TransformedFact};
use crate::db::dimensions::Category;
use crate::db::prevalence::PrevalenceRecord;
use crate::import::dimensions::{DimensionCache, DimensionColumn};
use std::collections::HashMap;
use tracing::warn;

/// Dimension lookup columns of the prevalence sheet
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
        category: Category::SamplingStage,
        column: "Sampling_stage",
        column_de: None,
    },
    DimensionColumn {
        category: Category::SampleOrigin,
        column: "Sample_origin",
        column_de: None,
    },
];

/// Categories the prevalence importer loads into its cache
pub const CATEGORIES: &[Category] = &[
    Category::Microorganism,
    Category::Matrix,
    Category::SamplingStage,
    Category::SampleOrigin,
];

/// Transform one normalized row. Returns None for rows with a blank
/// business id (the prevalence sheet calls it "ID").
pub fn transform(
    row: &HashMap<String, String>,
    cache: &DimensionCache,
    now: &str,
) -> Option<TransformedFact<PrevalenceRecord>> {
    let db_id = field(row, "ID").trim();
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

    let microorganism_id = resolve(&DIMENSION_COLUMNS[0]);
    let matrix_id = resolve(&DIMENSION_COLUMNS[1]);
    let sampling_stage_id = resolve(&DIMENSION_COLUMNS[2]);
    let sample_origin_id = resolve(&DIMENSION_COLUMNS[3]);

    let n_samples = parse_i64(row, "Number_of_samples");
    let n_positive = parse_i64(row, "Number_of_positive");

    let percentage_positive = parse_f64(row, "Percentage_positive").or_else(|| {
        match (n_positive, n_samples) {
            (Some(positive), Some(total)) if total > 0 => {
                Some((positive as f64 / total as f64 * 10_000.0).round() / 100.0)
            }
            _ => None,
        }
    });

    // Computed bounds only when the sheet leaves the CI cells blank
    let explicit = (parse_f64(row, "CI_min"), parse_f64(row, "CI_max"));
    let (ci_min, ci_max) = match explicit {
        (Some(min), Some(max)) => (Some(min), Some(max)),
        _ => match (n_positive, n_samples) {
            (Some(positive), Some(total)) => wilson_interval(positive, total)
                .map(|(lower, upper)| (Some(lower), Some(upper)))
                .unwrap_or((None, None)),
            _ => (None, None),
        },
    };

    let fact = PrevalenceRecord {
        db_id: db_id.to_string(),
        sampling_year: parse_year(row, "Year"),
        n_samples,
        n_positive,
        percentage_positive,
        ci_min,
        ci_max,
        microorganism_id,
        matrix_id,
        sampling_stage_id,
        sample_origin_id,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };

    Some(TransformedFact { fact, unresolved })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_blank_id_is_dropped() {
        let cache = DimensionCache::default();
        let now = chrono::Utc::now().to_rfc3339();
        assert!(transform(&row(&[("ID", " "), ("Year", "2019")]), &cache, &now).is_none());
    }

    #[test]
    fn test_explicit_ci_is_kept() {
        let cache = DimensionCache::default();
        let now = chrono::Utc::now().to_rfc3339();
        let transformed = transform(
            &row(&[
                ("ID", "PREV-1"),
                ("Year", "2019"),
                ("Number_of_samples", "400"),
                ("Number_of_positive", "36"),
                ("Percentage_positive", "9.0"),
                ("CI_min", "6.5"),
                ("CI_max", "12.2"),
            ]),
            &cache,
            &now,
        )
        .expect("row dropped");
        assert_eq!(transformed.fact.ci_min, Some(6.5));
        assert_eq!(transformed.fact.ci_max, Some(12.2));
        assert_eq!(transformed.fact.percentage_positive, Some(9.0));
    }

    #[test]
    fn test_blank_ci_is_computed() {
        let cache = DimensionCache::default();
        let now = chrono::Utc::now().to_rfc3339();
        let transformed = transform(
            &row(&[
                ("ID", "PREV-2"),
                ("Year", "2019"),
                ("Number_of_samples", "400"),
                ("Number_of_positive", "36"),
            ]),
            &cache,
            &now,
        )
        .expect("row dropped");

        // Percentage derived from the counts
        assert_eq!(transformed.fact.percentage_positive, Some(9.0));
        let lower = transformed.fact.ci_min.expect("ci_min");
        let upper = transformed.fact.ci_max.expect("ci_max");
        assert!(lower > 6.0 && lower < 7.0, "lower {lower}");
        assert!(upper > 12.0 && upper < 13.0, "upper {upper}");
    }
}
