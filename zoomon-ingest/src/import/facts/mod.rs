//! Fact row transformers
//!
//! One module per fact kind. Each transformer turns a normalized row plus
//! the fully-merged dimension cache into a typed fact record, and reports
//! which dimension values stayed unresolved so the runner can apply the
//! fact kind's policy.

pub mod isolate;
pub mod prevalence;
pub mod resistance;

use crate::db::dimensions::Category;
use std::collections::HashMap;

/// A transformed fact plus the dimension values that did not resolve
#[derive(Debug, Clone)]
pub struct TransformedFact<T> {
    pub fact: T,
    /// (category, raw value) pairs still unresolved after vivification
    pub unresolved: Vec<(Category, String)>,
}

/// Human-readable list of unresolved values for a strict-policy failure
pub fn describe_unresolved(unresolved: &[(Category, String)]) -> String {
    let parts: Vec<String> = unresolved
        .iter()
        .map(|(category, raw)| format!("{}='{}'", category, raw))
        .collect();
    format!("unresolved dimension values: {}", parts.join(", "))
}

pub(crate) fn field<'a>(row: &'a HashMap<String, String>, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

pub(crate) fn opt_string(row: &HashMap<String, String>, key: &str) -> Option<String> {
    let value = field(row, key).trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Leading digits of a year cell ("2016", "2016/2017", "2016.0" all parse
/// to 2016); anything without a leading digit is None
pub(crate) fn parse_year(row: &HashMap<String, String>, key: &str) -> Option<i64> {
    let value = field(row, key).trim();
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub(crate) fn parse_i64(row: &HashMap<String, String>, key: &str) -> Option<i64> {
    field(row, key).trim().parse().ok()
}

/// Float parsing tolerant of the German decimal comma
pub(crate) fn parse_f64(row: &HashMap<String, String>, key: &str) -> Option<f64> {
    field(row, key).trim().replace(',', ".").parse().ok()
}

/// Source-sheet modified flag: "1", "x", "true", "yes", "ja" (any case)
pub(crate) fn truthy_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "x" | "true" | "yes" | "ja"
    )
}

/// Wilson score interval at 95%, both bounds as percentages rounded to
/// two decimals
pub(crate) fn wilson_interval(positive: i64, total: i64) -> Option<(f64, f64)> {
    if total <= 0 || positive < 0 || positive > total {
        return None;
    }
    let z = 1.959964_f64;
    let n = total as f64;
    let phat = positive as f64 / n;
    let z2 = z * z;
    let denominator = 1.0 + z2 / n;
    let center = phat + z2 / (2.0 * n);
    let margin = z * (phat * (1.0 - phat) / n + z2 / (4.0 * n * n)).sqrt();
    let lower = ((center - margin) / denominator * 100.0).max(0.0);
    let upper = ((center + margin) / denominator * 100.0).min(100.0);
    Some((round2(lower), round2(upper)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
