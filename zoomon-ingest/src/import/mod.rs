//! Import pipeline
//!
//! One run per uploaded spreadsheet: parse, normalize headers, load the
//! dimension cache, auto-vivify missing dimension values, transform rows
//! into typed facts, then drive the upsert engine under the bounded
//! worker pool. The cache is fully built before the pool starts and
//! read-only afterwards, which is what makes the concurrent phase safe
//! without locking.

pub mod dimensions;
pub mod executor;
pub mod facts;
pub mod keys;
pub mod localize;
pub mod report;
pub mod workbook;

use crate::config::{ServiceConfig, UnresolvedPolicy};
use crate::db;
use crate::error::ImportError;
use crate::import::dimensions::DimensionCache;
use crate::import::executor::RecordOutcome;
use crate::import::facts::resistance::TransformedResistance;
use crate::import::report::{ImportReport, ReportFailure};
use crate::import::workbook::Workbook;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{error, info};
use uuid::Uuid;

/// The three supported fact kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    Isolates,
    Resistance,
    Prevalence,
}

impl FactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FactKind::Isolates => "isolates",
            FactKind::Resistance => "resistance",
            FactKind::Prevalence => "prevalence",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "isolates" => Some(FactKind::Isolates),
            "resistance" => Some(FactKind::Resistance),
            "prevalence" => Some(FactKind::Prevalence),
            _ => None,
        }
    }

    fn policy(self, config: &ServiceConfig) -> UnresolvedPolicy {
        match self {
            FactKind::Isolates => config.isolate_policy,
            FactKind::Resistance => config.resistance_policy,
            FactKind::Prevalence => config.prevalence_policy,
        }
    }
}

/// Run one import over raw spreadsheet bytes and write the report
/// artifact. Fatal errors abort before any record is processed;
/// per-record failures come back inside the report.
pub async fn run_import(
    pool: &SqlitePool,
    config: &ServiceConfig,
    kind: FactKind,
    bytes: &[u8],
) -> Result<ImportReport, ImportError> {
    let run_id = Uuid::new_v4();
    let report_file = report::report_path(&config.report_dir, kind.as_str());

    // The resistance import is run-once: a report on disk means the data
    // set was already loaded, and its presence suppresses re-import
    if kind == FactKind::Resistance {
        if let Some(prior) = ImportReport::read(&report_file)? {
            info!(
                run_id = %run_id,
                report = %report_file.display(),
                "Existing report found; resistance import skipped"
            );
            return Ok(prior);
        }
    }

    let workbook = Workbook::from_bytes(bytes)?;
    let sheet = workbook.data_sheet()?;
    let header = keys::HeaderMap::from_header(sheet.header().unwrap_or(&[]));
    let rows: Vec<HashMap<String, String>> = sheet
        .data_rows()
        .iter()
        .map(|cells| header.row_object(cells))
        .collect();

    info!(
        run_id = %run_id,
        kind = kind.as_str(),
        sheet = %sheet.name,
        rows = rows.len(),
        "Import run started"
    );

    let report = match kind {
        FactKind::Isolates => run_isolates(pool, config, &rows).await?,
        FactKind::Resistance => run_resistance(pool, config, &rows).await?,
        FactKind::Prevalence => run_prevalence(pool, config, &rows).await?,
    };

    report.write(&report_file)?;
    info!(
        run_id = %run_id,
        kind = kind.as_str(),
        total = report.total_records,
        saved = report.successfully_saved,
        failed = report.failures.len(),
        "Import run finished"
    );

    Ok(report)
}

async fn run_isolates(
    pool: &SqlitePool,
    config: &ServiceConfig,
    rows: &[HashMap<String, String>],
) -> Result<ImportReport, ImportError> {
    use facts::isolate;

    let policy = FactKind::Isolates.policy(config);
    let mut cache = DimensionCache::load(pool, isolate::CATEGORIES).await?;
    if policy == UnresolvedPolicy::KeepNullFk {
        let missing = dimensions::collect_missing(&cache, rows, isolate::DIMENSION_COLUMNS);
        dimensions::vivify(pool, &mut cache, missing).await?;
    }

    let now = Utc::now().to_rfc3339();
    let mut ready = Vec::new();
    let mut pre_failures = Vec::new();
    for transformed in rows.iter().filter_map(|row| isolate::transform(row, &cache, &now)) {
        if policy == UnresolvedPolicy::RejectRow && !transformed.unresolved.is_empty() {
            pre_failures.push(ReportFailure {
                id: transformed.fact.db_id.clone(),
                error: facts::describe_unresolved(&transformed.unresolved),
            });
        } else {
            ready.push(transformed.fact);
        }
    }
    let ready = dedupe_last_wins(ready, |fact| fact.db_id.as_str());

    let outcomes = executor::settle_all(ready, config.worker_count, |fact| {
        let pool = pool.clone();
        async move {
            match db::isolates::upsert(&pool, &fact).await {
                Ok(_) => RecordOutcome::Success { id: fact.db_id },
                Err(e) => {
                    error!(db_id = %fact.db_id, error = %e, "Isolate upsert failed");
                    RecordOutcome::Failure {
                        id: fact.db_id,
                        error: e.to_string(),
                    }
                }
            }
        }
    })
    .await;

    Ok(ImportReport::from_outcomes(pre_failures, &outcomes))
}

async fn run_resistance(
    pool: &SqlitePool,
    config: &ServiceConfig,
    rows: &[HashMap<String, String>],
) -> Result<ImportReport, ImportError> {
    use facts::resistance;

    // Strict fact kinds run against curated master data: no vivification,
    // unresolved values reject the row instead
    let policy = FactKind::Resistance.policy(config);
    let mut cache = DimensionCache::load(pool, resistance::CATEGORIES).await?;
    if policy == UnresolvedPolicy::KeepNullFk {
        let missing = dimensions::collect_missing(&cache, rows, resistance::DIMENSION_COLUMNS);
        dimensions::vivify(pool, &mut cache, missing).await?;
    }

    let now = Utc::now().to_rfc3339();
    let mut ready = Vec::new();
    let mut pre_failures = Vec::new();
    for transformed in rows.iter().filter_map(|row| resistance::transform(row, &cache, &now)) {
        if policy == UnresolvedPolicy::RejectRow && !transformed.unresolved.is_empty() {
            pre_failures.push(ReportFailure {
                id: transformed.en.db_id.clone(),
                error: facts::describe_unresolved(&transformed.unresolved),
            });
        } else {
            ready.push(transformed);
        }
    }
    let ready = dedupe_last_wins(ready, |t| t.en.db_id.as_str());

    let outcomes = executor::settle_all(ready, config.worker_count, |transformed| {
        let pool = pool.clone();
        async move {
            let db_id = transformed.en.db_id.clone();
            match upsert_resistance_pair(&pool, transformed).await {
                Ok(()) => RecordOutcome::Success { id: db_id },
                Err(e) => {
                    error!(db_id = %db_id, error = %e, "Resistance upsert failed");
                    RecordOutcome::Failure {
                        id: db_id,
                        error: e.to_string(),
                    }
                }
            }
        }
    })
    .await;

    Ok(ImportReport::from_outcomes(pre_failures, &outcomes))
}

/// Upsert the English record, then its German counterpart sharing the
/// stored English document id. A German failure surfaces as this record's
/// failure but never rolls back the committed English row.
async fn upsert_resistance_pair(
    pool: &SqlitePool,
    transformed: TransformedResistance,
) -> anyhow::Result<()> {
    let en = db::resistance::upsert(pool, &transformed.en, transformed.update_allowed).await?;
    if let Some(mut de) = transformed.de {
        de.document_id = en.document_id;
        db::resistance::upsert(pool, &de, transformed.update_allowed).await?;
    }
    Ok(())
}

async fn run_prevalence(
    pool: &SqlitePool,
    config: &ServiceConfig,
    rows: &[HashMap<String, String>],
) -> Result<ImportReport, ImportError> {
    use facts::prevalence;

    let policy = FactKind::Prevalence.policy(config);
    let mut cache = DimensionCache::load(pool, prevalence::CATEGORIES).await?;
    if policy == UnresolvedPolicy::KeepNullFk {
        let missing = dimensions::collect_missing(&cache, rows, prevalence::DIMENSION_COLUMNS);
        dimensions::vivify(pool, &mut cache, missing).await?;
    }

    let now = Utc::now().to_rfc3339();
    let mut ready = Vec::new();
    let mut pre_failures = Vec::new();
    for transformed in rows.iter().filter_map(|row| prevalence::transform(row, &cache, &now)) {
        if policy == UnresolvedPolicy::RejectRow && !transformed.unresolved.is_empty() {
            pre_failures.push(ReportFailure {
                id: transformed.fact.db_id.clone(),
                error: facts::describe_unresolved(&transformed.unresolved),
            });
        } else {
            ready.push(transformed.fact);
        }
    }
    let ready = dedupe_last_wins(ready, |fact| fact.db_id.as_str());

    let outcomes = executor::settle_all(ready, config.worker_count, |fact| {
        let pool = pool.clone();
        async move {
            match db::prevalence::upsert(&pool, &fact).await {
                Ok(_) => RecordOutcome::Success { id: fact.db_id },
                Err(e) => {
                    error!(db_id = %fact.db_id, error = %e, "Prevalence upsert failed");
                    RecordOutcome::Failure {
                        id: fact.db_id,
                        error: e.to_string(),
                    }
                }
            }
        }
    })
    .await;

    Ok(ImportReport::from_outcomes(pre_failures, &outcomes))
}

/// De-duplicate by business id before dispatch; the last occurrence wins,
/// at the position of the first. Removes the concurrent-upsert race two
/// identical keys would otherwise have inside the worker pool.
fn dedupe_last_wins<T>(items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        match position.get(key(&item)) {
            Some(&index) => out[index] = item,
            None => {
                position.insert(key(&item).to_string(), out.len());
                out.push(item);
            }
        }
    }
    out
}
