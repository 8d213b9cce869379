use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Orchestrator configuration, typically parsed from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Dispatch loop period in milliseconds.
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,
    /// Upper bound on executions running at the same time.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_executions: usize,
    /// How long `shutdown` waits for in-flight executions before aborting them.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Worker id stamped on results the orchestrator synthesizes itself.
    #[serde(default = "default_orchestrator_id")]
    pub orchestrator_id: String,
    /// Let submissions and completions wake the loop before the period ends.
    #[serde(default = "default_early_wake")]
    pub early_wake: bool,
}

fn default_cycle_period_ms() -> u64 { 100 }
fn default_max_concurrent() -> usize { 10 }
fn default_shutdown_timeout_ms() -> u64 { 5000 }
fn default_orchestrator_id() -> String { "orchestrator".to_string() }
fn default_early_wake() -> bool { true }

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: default_cycle_period_ms(),
            max_concurrent_executions: default_max_concurrent(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            orchestrator_id: default_orchestrator_id(),
            early_wake: default_early_wake(),
        }
    }
}

// ── Loading & Validation ────────────────────────────────────────────

impl OrchestratorConfig {
    /// Parse config from a TOML string, then apply env overrides and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults plus env overrides, for runs without a config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Convention: `MATRIX_KEY` overrides `key`, e.g.
    /// - `MATRIX_CYCLE_PERIOD_MS` → `cycle_period_ms`
    /// - `MATRIX_MAX_CONCURRENT_EXECUTIONS` → `max_concurrent_executions`
    /// - `MATRIX_SHUTDOWN_TIMEOUT_MS` → `shutdown_timeout_ms`
    /// - `MATRIX_ORCHESTRATOR_ID` → `orchestrator_id`
    /// - `MATRIX_EARLY_WAKE` → `early_wake`
    ///
    /// Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>("MATRIX_CYCLE_PERIOD_MS") {
            self.cycle_period_ms = v;
        }
        if let Some(v) = env_parse::<usize>("MATRIX_MAX_CONCURRENT_EXECUTIONS") {
            self.max_concurrent_executions = v;
        }
        if let Some(v) = env_parse::<u64>("MATRIX_SHUTDOWN_TIMEOUT_MS") {
            self.shutdown_timeout_ms = v;
        }
        if let Ok(v) = std::env::var("MATRIX_ORCHESTRATOR_ID") {
            if !v.is_empty() {
                self.orchestrator_id = v;
            }
        }
        if let Some(v) = env_parse::<bool>("MATRIX_EARLY_WAKE") {
            self.early_wake = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "cycle_period_ms must be greater than zero".into(),
            ));
        }
        if self.max_concurrent_executions == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_executions must be greater than zero".into(),
            ));
        }
        if self.orchestrator_id.trim().is_empty() {
            return Err(ConfigError::Invalid("orchestrator_id must not be empty".into()));
        }
        Ok(())
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Orchestrator config:");
        tracing::info!("  cycle:       {}ms (early wake: {})", self.cycle_period_ms, self.early_wake);
        tracing::info!("  executions:  max {}", self.max_concurrent_executions);
        tracing::info!("  shutdown:    {}ms grace", self.shutdown_timeout_ms);
        tracing::info!("  identity:    {}", self.orchestrator_id);
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
