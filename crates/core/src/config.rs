use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LanepoolError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Scheduler config ──────────────────────────────────────────

/// Scheduler configuration, typically parsed from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on concurrent lanes. 0 = one lane per worker.
    #[serde(default = "default_max_lanes")]
    pub max_lanes: usize,
    /// How many times a non-last lane tries to recover its worker per fault.
    #[serde(default = "default_recovery_attempts")]
    pub recovery_attempts: u32,
    /// Report composite items once per sub-unit when they are not executed.
    #[serde(default = "default_report_sub_units")]
    pub report_sub_units: bool,
    /// Prefix for lane thread names (`<prefix>-<index>`).
    #[serde(default = "default_lane_thread_prefix")]
    pub lane_thread_prefix: String,
}

fn default_max_lanes() -> usize { 0 }
fn default_recovery_attempts() -> u32 { 1 }
fn default_report_sub_units() -> bool { true }
fn default_lane_thread_prefix() -> String { "lane".to_string() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_lanes: default_max_lanes(),
            recovery_attempts: default_recovery_attempts(),
            report_sub_units: default_report_sub_units(),
            lane_thread_prefix: default_lane_thread_prefix(),
        }
    }
}

impl SchedulerConfig {
    /// Parse config from a TOML string. Environment overrides are not applied.
    pub fn from_toml(toml_str: &str) -> Result<Self, LanepoolError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path and apply `LANEPOOL_*` environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LanepoolError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Resolve the number of lanes to start for a fleet of `worker_count` workers.
    pub fn resolved_lanes(&self, worker_count: usize) -> usize {
        if self.max_lanes == 0 {
            worker_count
        } else {
            self.max_lanes.min(worker_count)
        }
    }

    pub fn validate(&self) -> Result<(), LanepoolError> {
        if self.lane_thread_prefix.trim().is_empty() {
            return Err(LanepoolError::Config(
                "lane_thread_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Scheduler config:");
        tracing::info!("  max_lanes:          {}", self.max_lanes);
        tracing::info!("  recovery_attempts:  {}", self.recovery_attempts);
        tracing::info!("  report_sub_units:   {}", self.report_sub_units);
        tracing::info!("  lane_thread_prefix: {}", self.lane_thread_prefix);
    }

    // ── Environment variable overrides ──────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `LANEPOOL_KEY` overrides `key`.
    /// - `LANEPOOL_MAX_LANES` -> `max_lanes`
    /// - `LANEPOOL_RECOVERY_ATTEMPTS` -> `recovery_attempts`
    /// - `LANEPOOL_REPORT_SUB_UNITS` -> `report_sub_units`
    /// - `LANEPOOL_LANE_THREAD_PREFIX` -> `lane_thread_prefix`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LANEPOOL_MAX_LANES") {
            if let Ok(n) = v.parse::<usize>() {
                self.max_lanes = n;
            }
        }
        if let Some(v) = lookup("LANEPOOL_RECOVERY_ATTEMPTS") {
            if let Ok(n) = v.parse::<u32>() {
                self.recovery_attempts = n;
            }
        }
        if let Some(v) = lookup("LANEPOOL_REPORT_SUB_UNITS") {
            self.report_sub_units = v == "true" || v == "1";
        }
        if let Some(v) = lookup("LANEPOOL_LANE_THREAD_PREFIX") {
            self.lane_thread_prefix = v;
        }
    }
}
