//! Outward-facing collaborator traits: result reporting, diagnostics and
//! per-item metric collection.

use std::collections::BTreeMap;
use std::fmt;

use lanepool_core::{FailureStatus, Metrics};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Receives run lifecycle notifications from every lane.
///
/// One sink is shared by all lanes, so implementations must tolerate
/// concurrent calls. Within a lane, `on_run_started` always precedes the
/// matching `on_run_failed` / `on_run_ended`.
pub trait ResultSink: Send + Sync {
    fn on_run_started(&self, name: &str, item_count: usize);

    /// Per-test progress, emitted by workers while an item runs.
    fn on_item_started(&self, _id: &str) {}

    fn on_item_ended(&self, _id: &str, _metrics: &Metrics) {}

    fn on_run_failed(&self, id: &str, reason: &str, status: FailureStatus);

    fn on_run_ended(&self, duration_ms: u64, metrics: &Metrics);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured diagnostic events the scheduler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    /// The last live lane lost its worker and aborted the run.
    SchedulerEarlyTermination,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SchedulerEarlyTermination => "scheduler early termination",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for diagnostic events that outlive the run's log output.
pub trait DiagnosticLog: Send + Sync {
    fn log_event(&self, level: LogLevel, event_type: EventType, metadata: &BTreeMap<String, String>);
}

/// [`DiagnosticLog`] that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticLog;

impl DiagnosticLog for TracingDiagnosticLog {
    fn log_event(&self, level: LogLevel, event_type: EventType, metadata: &BTreeMap<String, String>) {
        let metadata = serde_json::to_string(metadata).unwrap_or_default();
        match level {
            LogLevel::Debug => debug!(event = %event_type, %metadata, "diagnostic event"),
            LogLevel::Info => info!(event = %event_type, %metadata, "diagnostic event"),
            LogLevel::Warn => warn!(event = %event_type, %metadata, "diagnostic event"),
            LogLevel::Error => error!(event = %event_type, %metadata, "diagnostic event"),
        }
    }
}

/// Hook that observes each item a lane runs and contributes run metrics.
///
/// Collectors are registered on the scheduler before the run and shared by
/// all lanes; their output only decorates `on_run_ended` and never affects
/// scheduling.
pub trait MetricCollector: Send + Sync {
    fn name(&self) -> &str;

    fn on_item_started(&self, _id: &str) {}

    fn on_item_ended(&self, id: &str, metrics: &mut Metrics);
}
