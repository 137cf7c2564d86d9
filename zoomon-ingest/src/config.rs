//! Service configuration resolution for zoomon-ingest
//!
//! Priority: environment variables > TOML file > compiled defaults.
//! Environment prefix is `ZOOMON_`.

use std::path::PathBuf;
use tracing::warn;
use zoomon_common::config::{self, TomlConfig};

/// What to do with a fact row whose dimension value is still unresolved
/// after auto-vivification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Keep the row, leave the foreign key null (lenient fact types)
    KeepNullFk,
    /// Drop the row and record a failure naming the missing values
    /// (strict fact types)
    RejectRow,
}

impl UnresolvedPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "keep_null_fk" => Some(UnresolvedPolicy::KeepNullFk),
            "reject_row" => Some(UnresolvedPolicy::RejectRow),
            _ => None,
        }
    }
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub report_dir: PathBuf,
    /// Worker count for the bounded upsert pool
    pub worker_count: usize,
    pub isolate_policy: UnresolvedPolicy,
    pub resistance_policy: UnresolvedPolicy,
    pub prevalence_policy: UnresolvedPolicy,
    /// tracing filter directive used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let data_dir = config::default_data_dir();
        Self {
            port: 5810,
            database_path: data_dir.join("zoomon.db"),
            report_dir: data_dir.join("reports"),
            worker_count: 100,
            isolate_policy: UnresolvedPolicy::KeepNullFk,
            resistance_policy: UnresolvedPolicy::RejectRow,
            prevalence_policy: UnresolvedPolicy::KeepNullFk,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from the default TOML location plus environment
    pub fn resolve() -> Self {
        let toml_config = config::default_config_path("zoomon-ingest")
            .filter(|p| p.exists())
            .and_then(|p| match config::load_toml_config(&p) {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!("Ignoring unreadable config file: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        Self::from_toml(toml_config)
    }

    /// Apply a TOML layer and environment overrides over the defaults
    pub fn from_toml(toml_config: TomlConfig) -> Self {
        let mut cfg = Self::default();

        if let Some(port) = toml_config.port {
            cfg.port = port;
        }
        if let Some(path) = toml_config.database_path {
            cfg.database_path = path;
        }
        if let Some(dir) = toml_config.report_dir {
            cfg.report_dir = dir;
        }
        cfg.log_level = toml_config.logging.level;
        if let Some(count) = toml_config.import.worker_count {
            cfg.worker_count = count;
        }
        apply_policy(
            &mut cfg.isolate_policy,
            toml_config.import.isolate_policy.as_deref(),
            "isolate_policy",
        );
        apply_policy(
            &mut cfg.resistance_policy,
            toml_config.import.resistance_policy.as_deref(),
            "resistance_policy",
        );
        apply_policy(
            &mut cfg.prevalence_policy,
            toml_config.import.prevalence_policy.as_deref(),
            "prevalence_policy",
        );

        // Environment overrides (highest priority)
        cfg.apply_env(|key| std::env::var(key).ok());

        cfg
    }

    /// Apply `ZOOMON_*` overrides from an environment lookup
    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(port) = get("ZOOMON_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!("Ignoring unparseable ZOOMON_PORT: {}", port),
            }
        }
        if let Some(path) = get("ZOOMON_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = get("ZOOMON_REPORT_DIR") {
            self.report_dir = PathBuf::from(dir);
        }
        if let Some(count) = get("ZOOMON_WORKER_COUNT") {
            match count.parse() {
                Ok(c) => self.worker_count = c,
                Err(_) => warn!("Ignoring unparseable ZOOMON_WORKER_COUNT: {}", count),
            }
        }
        apply_policy(
            &mut self.isolate_policy,
            get("ZOOMON_ISOLATE_POLICY").as_deref(),
            "ZOOMON_ISOLATE_POLICY",
        );
        apply_policy(
            &mut self.resistance_policy,
            get("ZOOMON_RESISTANCE_POLICY").as_deref(),
            "ZOOMON_RESISTANCE_POLICY",
        );
        apply_policy(
            &mut self.prevalence_policy,
            get("ZOOMON_PREVALENCE_POLICY").as_deref(),
            "ZOOMON_PREVALENCE_POLICY",
        );
    }
}

fn apply_policy(slot: &mut UnresolvedPolicy, raw: Option<&str>, key: &str) {
    if let Some(raw) = raw {
        match UnresolvedPolicy::parse(raw) {
            Some(policy) => *slot = policy,
            None => warn!("Ignoring unknown {} value: {}", key, raw),
        }
    }
}
