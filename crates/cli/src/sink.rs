use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use lanepool_core::{FailureStatus, Metrics};
use lanepool_scheduler::ResultSink;

/// Result counts gathered by [`LoggingSink`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultCounts {
    pub started: usize,
    pub ended: usize,
    /// Failure records keyed by status name.
    pub failures: BTreeMap<String, usize>,
}

/// Logs every result event and keeps per-status counts for the final report.
#[derive(Default)]
pub struct LoggingSink {
    counts: Mutex<ResultCounts>,
}

impl LoggingSink {
    pub fn counts(&self) -> ResultCounts {
        self.counts
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut ResultCounts)) {
        let mut counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut counts);
    }
}

impl ResultSink for LoggingSink {
    fn on_run_started(&self, name: &str, item_count: usize) {
        info!(item = %name, tests = item_count, "run started");
        self.update(|c| c.started += 1);
    }

    fn on_item_started(&self, id: &str) {
        debug!(test = %id, "test started");
    }

    fn on_item_ended(&self, id: &str, _metrics: &Metrics) {
        debug!(test = %id, "test ended");
    }

    fn on_run_failed(&self, id: &str, reason: &str, status: FailureStatus) {
        warn!(item = %id, %status, %reason, "run failed");
        self.update(|c| *c.failures.entry(status.as_str().to_string()).or_default() += 1);
    }

    fn on_run_ended(&self, duration_ms: u64, metrics: &Metrics) {
        info!(duration_ms, metrics = metrics.len(), "run ended");
        self.update(|c| c.ended += 1);
    }
}
