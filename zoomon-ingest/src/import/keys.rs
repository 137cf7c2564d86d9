//! Header key normalization
//!
//! Raw spreadsheet headers become canonical field keys: each run of
//! whitespace and each literal `/`, `.`, `-` is replaced by `_`. The
//! mapping is built once from the header row and reused for every data
//! row of the sheet.

use std::collections::HashMap;

/// Normalize one raw header into a canonical key
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            // A run of whitespace collapses to a single underscore
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            out.push('_');
        } else if matches!(c, '/' | '.' | '-') {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// One header column with its canonical key
#[derive(Debug, Clone)]
pub struct HeaderColumn {
    pub index: usize,
    pub raw: String,
    pub key: String,
}

/// Index-to-key mapping derived from the header row
#[derive(Debug, Clone)]
pub struct HeaderMap {
    columns: Vec<HeaderColumn>,
}

impl HeaderMap {
    pub fn from_header(header: &[String]) -> Self {
        let columns = header
            .iter()
            .enumerate()
            .map(|(index, raw)| HeaderColumn {
                index,
                raw: raw.clone(),
                key: normalize_key(raw),
            })
            .collect();
        Self { columns }
    }

    /// Build the key -> value map for one data row.
    ///
    /// Two headers normalizing to the same key are not deduplicated: the
    /// last column wins. Inherited quirk of the source data sets; kept
    /// deliberately and covered by a test.
    pub fn row_object(&self, cells: &[String]) -> HashMap<String, String> {
        let mut row = HashMap::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = cells.get(column.index).cloned().unwrap_or_default();
            row.insert(column.key.clone(), value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_rule() {
        assert_eq!(
            normalize_key("Animal species/food upper category"),
            "Animal_species_food_upper_category"
        );
        assert_eq!(normalize_key("A/B-C.D"), "A_B_C_D");
        // Parentheses and digits pass through untouched
        assert_eq!(normalize_key("95 Konfintervall (min)"), "95_Konfintervall_(min)");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(normalize_key("Sampling   stage"), "Sampling_stage");
        assert_eq!(normalize_key("a \t b"), "a_b");
        // Delimiters adjacent to whitespace each produce their own underscore
        assert_eq!(normalize_key("a - b"), "a___b");
    }

    #[test]
    fn test_row_object_maps_by_index() {
        let header = vec!["DB_ID".to_string(), "Sampling year".to_string()];
        let map = HeaderMap::from_header(&header);
        let row = map.row_object(&["ZN-1".to_string(), "2021".to_string()]);
        assert_eq!(row.get("DB_ID").map(String::as_str), Some("ZN-1"));
        assert_eq!(row.get("Sampling_year").map(String::as_str), Some("2021"));
    }

    #[test]
    fn test_duplicate_keys_last_column_wins() {
        // "A B" and "A-B" collide on the canonical key A_B
        let header = vec!["A B".to_string(), "A-B".to_string()];
        let map = HeaderMap::from_header(&header);
        let row = map.row_object(&["first".to_string(), "second".to_string()]);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("A_B").map(String::as_str), Some("second"));
    }

    #[test]
    fn test_short_row_pads_with_empty() {
        let header = vec!["DB_ID".to_string(), "Year".to_string(), "Matrix".to_string()];
        let map = HeaderMap::from_header(&header);
        let row = map.row_object(&["ZN-2".to_string()]);
        assert_eq!(row.get("Year").map(String::as_str), Some(""));
        assert_eq!(row.get("Matrix").map(String::as_str), Some(""));
    }
}
