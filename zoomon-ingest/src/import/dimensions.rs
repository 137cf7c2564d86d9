//! Per-run dimension cache, resolver and auto-vivifier
//!
//! The cache is loaded once at run start, extended once by vivification,
//! and read-only while the upsert pool runs. It is owned by a single run;
//! nothing here outlives the batch.

use crate::db::dimensions::{self, Category, DimensionRecord};
use crate::import::localize;
use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Where a fact kind's sheet keeps the raw value for one category
#[derive(Debug, Clone, Copy)]
pub struct DimensionColumn {
    pub category: Category,
    /// Canonical key of the English (or only) value column
    pub column: &'static str,
    /// Canonical key of the German value column, for bilingual sheets
    pub column_de: Option<&'static str>,
}

/// In-memory snapshot of the dimension tables for one import run
#[derive(Debug, Default)]
pub struct DimensionCache {
    records: HashMap<Category, Vec<DimensionRecord>>,
}

impl DimensionCache {
    /// Bulk-fetch every category a fact kind references
    pub async fn load(pool: &SqlitePool, categories: &[Category]) -> Result<Self> {
        let mut records = HashMap::new();
        for &category in categories {
            let loaded = dimensions::find_all(pool, category).await?;
            debug!(category = %category, count = loaded.len(), "Dimension cache loaded");
            records.insert(category, loaded);
        }
        Ok(Self { records })
    }

    /// Resolve a raw value to a record id against the canonical (English
    /// or locale-less) snapshot. Exact case-sensitive match on `name`, or
    /// on `token` for ontology-tuple categories. Pure lookup.
    pub fn resolve(&self, category: Category, raw: &str) -> Option<i64> {
        self.resolve_locale(category, raw, "en")
    }

    /// Resolve against a specific locale (locale-less records match any)
    pub fn resolve_locale(&self, category: Category, raw: &str, locale: &str) -> Option<i64> {
        if raw.is_empty() {
            return None;
        }
        self.records.get(&category)?.iter().find_map(|record| {
            let locale_matches = match record.locale.as_deref() {
                None => true,
                Some(l) => l == locale,
            };
            if !locale_matches {
                return None;
            }
            let key = if category.token_keyed() {
                record.token.as_deref().unwrap_or(&record.name)
            } else {
                &record.name
            };
            (key == raw).then_some(record.id)
        })
    }

    /// Extend the snapshot with freshly created records
    pub fn merge(&mut self, category: Category, new_records: Vec<DimensionRecord>) {
        self.records.entry(category).or_default().extend(new_records);
    }
}

/// Distinct raw values that failed to resolve, per category.
///
/// For bilingual sheets the German name rides along with the English one
/// so vivification can create the pair in one pass.
#[derive(Debug, Default)]
pub struct MissingValues {
    values: HashMap<Category, BTreeMap<String, Option<String>>>,
}

impl MissingValues {
    /// Record an unresolved value; empty raw values are not collected
    pub fn note(&mut self, category: Category, raw: &str, raw_de: Option<&str>) {
        if raw.is_empty() {
            return;
        }
        let entry = self
            .values
            .entry(category)
            .or_default()
            .entry(raw.to_string())
            .or_insert(None);
        if let Some(de) = raw_de.filter(|s| !s.is_empty()) {
            *entry = Some(de.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(BTreeMap::is_empty)
    }

    pub fn distinct_count(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }
}

/// Scan all normalized rows and collect the distinct set of values that do
/// not resolve against the current cache.
///
/// For bilingual columns a pair is also collected when only the German
/// side is unresolved, so an English record created by an earlier
/// monolingual import still gets its German counterpart linked.
pub fn collect_missing(
    cache: &DimensionCache,
    rows: &[HashMap<String, String>],
    columns: &[DimensionColumn],
) -> MissingValues {
    let mut missing = MissingValues::default();
    for row in rows {
        for lookup in columns {
            let raw = row.get(lookup.column).map(String::as_str).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            let raw_de = lookup
                .column_de
                .and_then(|key| row.get(key))
                .map(String::as_str)
                .filter(|s| !s.is_empty());
            let en_unresolved = cache.resolve(lookup.category, raw).is_none();
            let de_unresolved = raw_de
                .is_some_and(|de| cache.resolve_locale(lookup.category, de, "de").is_none());
            if en_unresolved || de_unresolved {
                missing.note(lookup.category, raw, raw_de);
            }
        }
    }
    missing
}

/// Create every missing value exactly once and merge the new records back
/// into the cache. Returns the number of created records.
///
/// Locale-less categories get one bulk insert per category; localized
/// categories have no bulk path (creation goes through the localization
/// linker), so they fall back to one sequential find-or-create per
/// distinct value.
pub async fn vivify(
    pool: &SqlitePool,
    cache: &mut DimensionCache,
    missing: MissingValues,
) -> Result<usize> {
    let mut created_total = 0;
    for (category, values) in missing.values {
        if values.is_empty() {
            continue;
        }
        if category.localized() {
            let mut created = Vec::new();
            for (name_en, name_de) in values {
                // The pair may be here only because its German side is
                // missing; merge just the records the cache did not know
                let en_known = cache.resolve(category, &name_en).is_some();
                let pair =
                    localize::link_or_create(pool, category, &name_en, name_de.as_deref()).await?;
                if !en_known {
                    created.push(pair.en);
                }
                if let Some(de) = pair.de {
                    if cache.resolve_locale(category, &de.name, "de").is_none() {
                        created.push(de);
                    }
                }
            }
            created_total += created.len();
            info!(category = %category, created = created.len(), "Auto-created localized dimension values");
            cache.merge(category, created);
        } else {
            let names: Vec<String> = values.into_keys().collect();
            let created = dimensions::create_many(pool, category, &names).await?;
            created_total += created.len();
            info!(category = %category, created = created.len(), "Auto-created dimension values");
            cache.merge(category, created);
        }
    }
    Ok(created_total)
}
