use std::sync::Arc;

use lanepool_core::{FailureStatus, Metrics};
use tracing::{debug, info};

use crate::item::WorkItem;
use crate::sink::ResultSink;

/// Turns work that never ran into explicit not-executed results.
///
/// Each reported unit produces `on_run_started`, `on_run_failed` with
/// [`FailureStatus::NotExecuted`] and a zero-length `on_run_ended`, so
/// downstream consumers can match declared work 1:1 against results.
#[derive(Clone)]
pub struct NotExecutedReporter {
    sink: Arc<dyn ResultSink>,
    split_sub_units: bool,
}

impl NotExecutedReporter {
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self { sink, split_sub_units: true }
    }

    /// Whether composite items are reported per sub-unit (the default) or once.
    pub fn with_sub_units(mut self, split: bool) -> Self {
        self.split_sub_units = split;
        self
    }

    /// Report every item as not executed. Returns the number of
    /// not-executed records emitted.
    pub fn report(&self, items: &[Box<dyn WorkItem>], reason: &str) -> usize {
        if items.is_empty() {
            return 0;
        }
        let mut emitted = 0;
        for item in items {
            emitted += self.report_item(item.as_ref(), reason);
        }
        info!(items = items.len(), records = emitted, %reason, "reported work as not executed");
        emitted
    }

    fn report_item(&self, item: &dyn WorkItem, reason: &str) -> usize {
        let sub_units = if self.split_sub_units {
            item.split_for_reporting().filter(|units| !units.is_empty())
        } else {
            None
        };

        match sub_units {
            Some(units) => {
                for unit in &units {
                    self.emit(unit, 1, reason);
                }
                units.len()
            }
            None => {
                self.emit(item.id(), item.test_count(), reason);
                1
            }
        }
    }

    fn emit(&self, id: &str, test_count: usize, reason: &str) {
        debug!(item = %id, "not executed");
        self.sink.on_run_started(id, test_count);
        self.sink.on_run_failed(id, reason, FailureStatus::NotExecuted);
        self.sink.on_run_ended(0, &Metrics::new());
    }
}
