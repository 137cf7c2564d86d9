//! Configuration loading for zoomon services
//!
//! Services resolve their settings with ENV > TOML file > compiled default
//! priority. This module owns the TOML layer; each service applies its own
//! environment overrides on top.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging section of the service TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "zoomon_ingest=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Import section of the service TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportToml {
    /// Worker count for the bounded upsert pool
    pub worker_count: Option<usize>,
    /// Unresolved-dimension policy per fact type: "keep_null_fk" or "reject_row"
    pub isolate_policy: Option<String>,
    pub resistance_policy: Option<String>,
    pub prevalence_policy: Option<String>,
}

/// Service TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub import: ImportToml,
}

/// Default configuration file path for a service, e.g.
/// `~/.config/zoomon/zoomon-ingest.toml`
pub fn default_config_path(service: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("zoomon").join(format!("{service}.toml")))
}

/// OS-dependent default data directory for databases and report artifacts
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("zoomon"))
        .unwrap_or_else(|| PathBuf::from("./zoomon_data"))
}

/// Load a service TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write a service TOML configuration file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toml_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("zoomon-ingest.toml");

        let config = TomlConfig {
            port: Some(5810),
            database_path: Some(PathBuf::from("/data/zoomon.db")),
            report_dir: Some(PathBuf::from("/data/reports")),
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
            import: ImportToml {
                worker_count: Some(25),
                isolate_policy: Some("keep_null_fk".to_string()),
                resistance_policy: Some("reject_row".to_string()),
                prevalence_policy: None,
            },
        };

        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(&path).unwrap();

        assert_eq!(loaded.port, Some(5810));
        assert_eq!(loaded.report_dir, Some(PathBuf::from("/data/reports")));
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.import.worker_count, Some(25));
        assert_eq!(loaded.import.resistance_policy.as_deref(), Some("reject_row"));
    }

    #[test]
    fn test_missing_sections_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("minimal.toml");
        std::fs::write(&path, "port = 8080\n").unwrap();

        let loaded = load_toml_config(&path).unwrap();
        assert_eq!(loaded.port, Some(8080));
        assert_eq!(loaded.logging.level, "info");
        assert!(loaded.import.worker_count.is_none());
    }

    #[test]
    fn test_parse_error_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "port = [not valid").unwrap();

        let err = load_toml_config(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
