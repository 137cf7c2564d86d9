//! Import report artifact
//!
//! One JSON document per run, written to a fixed per-fact-kind path. The
//! field names are part of the external contract and stay in the source
//! system's casing.

use crate::error::ImportError;
use crate::import::executor::RecordOutcome;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One rejected record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportFailure {
    pub id: String,
    pub error: String,
}

/// Aggregated outcome of one import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    #[serde(rename = "TotalRecords")]
    pub total_records: usize,
    #[serde(rename = "SuccessfullySaved")]
    pub successfully_saved: usize,
    #[serde(rename = "Failures")]
    pub failures: Vec<ReportFailure>,
}

impl ImportReport {
    /// Aggregate settle-all outcomes plus failures collected before
    /// dispatch (strict-policy rejections)
    pub fn from_outcomes(pre_failures: Vec<ReportFailure>, outcomes: &[RecordOutcome]) -> Self {
        let mut failures = pre_failures;
        let total_records = outcomes.len() + failures.len();
        let mut successfully_saved = 0;
        for outcome in outcomes {
            match outcome {
                RecordOutcome::Success { .. } => successfully_saved += 1,
                RecordOutcome::Failure { id, error } => failures.push(ReportFailure {
                    id: id.clone(),
                    error: error.clone(),
                }),
            }
        }
        Self {
            total_records,
            successfully_saved,
            failures,
        }
    }

    /// Write the report, creating the report directory if needed
    pub fn write(&self, path: &Path) -> Result<(), ImportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a previously written report, if one exists
    pub fn read(path: &Path) -> Result<Option<ImportReport>, ImportError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Fixed report location for a fact kind
pub fn report_path(report_dir: &Path, kind_name: &str) -> PathBuf {
    report_dir.join(format!("{kind_name}_import_report.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_aggregation() {
        let pre = vec![ReportFailure {
            id: "ZN-9".to_string(),
            error: "unresolved dimension values: matrix='Lettuce'".to_string(),
        }];
        let outcomes = vec![
            RecordOutcome::Success { id: "ZN-1".to_string() },
            RecordOutcome::Failure {
                id: "ZN-2".to_string(),
                error: "database is locked".to_string(),
            },
            RecordOutcome::Success { id: "ZN-3".to_string() },
        ];

        let report = ImportReport::from_outcomes(pre, &outcomes);
        assert_eq!(report.total_records, 4);
        assert_eq!(report.successfully_saved, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].id, "ZN-9");
        assert_eq!(report.failures[1].id, "ZN-2");
    }

    #[test]
    fn test_external_field_names() {
        let report = ImportReport {
            total_records: 1,
            successfully_saved: 1,
            failures: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("TotalRecords").is_some());
        assert!(json.get("SuccessfullySaved").is_some());
        assert!(json.get("Failures").is_some());
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = report_path(&temp_dir.path().join("reports"), "resistance");

        assert!(ImportReport::read(&path).unwrap().is_none());

        let report = ImportReport {
            total_records: 10,
            successfully_saved: 9,
            failures: vec![ReportFailure {
                id: "RES-4".to_string(),
                error: "boom".to_string(),
            }],
        };
        report.write(&path).unwrap();

        let loaded = ImportReport::read(&path).unwrap().expect("report missing");
        assert_eq!(loaded.total_records, 10);
        assert_eq!(loaded.successfully_saved, 9);
        assert_eq!(loaded.failures, report.failures);
    }
}
