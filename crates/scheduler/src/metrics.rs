use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational metrics, shared by all lanes of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// Items executed by lane serial.
    pub items_executed: HashMap<String, u64>,
    /// Average item duration by lane serial.
    pub avg_item_duration: HashMap<String, Duration>,
    /// Last item completion time by lane serial.
    pub last_item_at: HashMap<String, DateTime<Utc>>,
    /// Faults observed, keyed by fault kind.
    pub faults: HashMap<String, u64>,
    /// Successful worker recoveries across all lanes.
    pub recoveries: u64,
    /// Not-executed records emitted.
    pub not_executed: u64,
}

impl RunMetrics {
    /// Record an item that reached its worker, whatever the result.
    pub fn record_execution(&mut self, serial: &str, duration: Duration) {
        *self.items_executed.entry(serial.to_string()).or_default() += 1;
        self.last_item_at.insert(serial.to_string(), Utc::now());

        let count = self.items_executed[serial];
        let prev_avg = self
            .avg_item_duration
            .get(serial)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };

        self.avg_item_duration.insert(serial.to_string(), new_avg);
    }

    pub fn record_fault(&mut self, kind: &str) {
        *self.faults.entry(kind.to_string()).or_default() += 1;
    }

    pub fn record_recovery(&mut self) {
        self.recoveries += 1;
    }

    pub fn record_not_executed(&mut self, count: usize) {
        self.not_executed += count as u64;
    }

    pub fn total_executed(&self) -> u64 {
        self.items_executed.values().sum()
    }
}
