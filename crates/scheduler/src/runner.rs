use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use lanepool_core::{
    format_tokens, SchedulerConfig, NOT_EXECUTED_DEVICE_UNAVAILABLE,
    NOT_EXECUTED_NO_MATCHING_DEVICE,
};
use tracing::{error, info, warn};

use crate::error::SchedulingError;
use crate::item::WorkItem;
use crate::lane::{ExecutionLane, LaneContext};
use crate::metrics::RunMetrics;
use crate::pool::WorkPool;
use crate::recovery::RecoveryPolicy;
use crate::reporter::NotExecutedReporter;
use crate::sink::{DiagnosticLog, MetricCollector, ResultSink, TracingDiagnosticLog};
use crate::tracker::LaneTracker;
use crate::types::{LaneReport, RunSummary};
use crate::worker::Worker;

/// Scheduler entry point. Distributes one pool of work items over one
/// execution lane per worker and blocks until every lane has terminated.
pub struct Scheduler {
    config: SchedulerConfig,
    sink: Arc<dyn ResultSink>,
    diagnostics: Arc<dyn DiagnosticLog>,
    /// Collectors attached to every item run.
    collectors: Vec<Arc<dyn MetricCollector>>,
    /// Metrics of the current (or last) run.
    metrics: Arc<RwLock<RunMetrics>>,
}

impl Scheduler {
    /// Create a scheduler reporting to `sink`, with diagnostics sent to `tracing`.
    pub fn new(config: SchedulerConfig, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            config,
            sink,
            diagnostics: Arc::new(TracingDiagnosticLog),
            collectors: Vec::new(),
            metrics: Arc::new(RwLock::new(RunMetrics::default())),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticLog>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Register a metric collector applied to every item of every lane.
    pub fn register_collector(&mut self, collector: Arc<dyn MetricCollector>) {
        info!("Registered metric collector: {}", collector.name());
        self.collectors.push(collector);
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get a snapshot of the current run metrics.
    pub fn metrics(&self) -> RunMetrics {
        self.metrics
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Get an Arc to the metrics (for reads while a run is in progress).
    pub fn metrics_handle(&self) -> Arc<RwLock<RunMetrics>> {
        Arc::clone(&self.metrics)
    }

    /// Run every item and return the accounting, or the fatal error of the run.
    ///
    /// On error every item has still been reported to the sink; use
    /// [`execute`](Self::execute) to get the summary alongside a failed run.
    pub fn run_all(
        &self,
        items: Vec<Box<dyn WorkItem>>,
        workers: Vec<Box<dyn Worker>>,
    ) -> Result<RunSummary, SchedulingError> {
        let summary = self.execute(items, workers)?;
        match summary.error() {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Run every item and return the accounting whatever the lanes' outcome.
    ///
    /// Fails only when no lane could be started; the pending items are
    /// reported not executed first.
    pub fn execute(
        &self,
        items: Vec<Box<dyn WorkItem>>,
        mut workers: Vec<Box<dyn Worker>>,
    ) -> Result<RunSummary, SchedulingError> {
        let started_at = Utc::now();
        let submitted = items.len();
        if let Ok(mut m) = self.metrics.write() {
            *m = RunMetrics::default();
        }
        let reporter =
            NotExecutedReporter::new(Arc::clone(&self.sink)).with_sub_units(self.config.report_sub_units);

        let lanes = self.config.resolved_lanes(workers.len());
        if workers.len() > lanes {
            info!(
                "Using {} of {} workers (max_lanes = {})",
                lanes,
                workers.len(),
                self.config.max_lanes
            );
            workers.truncate(lanes);
        }

        if lanes == 0 {
            error!("No workers available, {} items will not run", submitted);
            let emitted = reporter.report(&items, NOT_EXECUTED_DEVICE_UNAVAILABLE);
            self.record_not_executed(emitted);
            return Err(SchedulingError::NoLanes { pending: submitted });
        }

        // Token pre-filter: work no worker can satisfy never reaches a lane.
        let (runnable, unmatched): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| {
            let required = item.required_tokens();
            required.is_empty() || workers.iter().any(|w| w.has_tokens(&required))
        });
        for item in &unmatched {
            warn!(
                item = %item.id(),
                tokens = %format_tokens(&item.required_tokens()),
                "no device matches required tokens"
            );
        }
        let filtered = reporter.report(&unmatched, NOT_EXECUTED_NO_MATCHING_DEVICE);
        self.record_not_executed(filtered);

        info!(
            "Scheduler starting with {} lanes, {} items ({} token-filtered)",
            lanes,
            runnable.len(),
            unmatched.len()
        );

        let pool = Arc::new(WorkPool::from_items(runnable));
        let tracker = Arc::new(LaneTracker::new());
        tracker.register_lanes(lanes);

        let ctx = LaneContext {
            pool: Arc::clone(&pool),
            tracker: Arc::clone(&tracker),
            sink: Arc::clone(&self.sink),
            reporter: reporter.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
            collectors: self.collectors.clone(),
            policy: RecoveryPolicy::new(self.config.recovery_attempts),
            metrics: Arc::clone(&self.metrics),
        };

        let prefix = self.config.lane_thread_prefix.clone();
        let threads = match rayon::ThreadPoolBuilder::new()
            .num_threads(lanes)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
        {
            Ok(threads) => threads,
            Err(e) => {
                error!("Failed to build lane thread pool: {}", e);
                let pending = pool.drain_remaining();
                let emitted = reporter.report(&pending, NOT_EXECUTED_DEVICE_UNAVAILABLE);
                self.record_not_executed(emitted);
                return Err(SchedulingError::NoLanes { pending: pending.len() });
            }
        };

        let lanes: Vec<ExecutionLane> = workers
            .into_iter()
            .map(|worker| ExecutionLane::new(worker, ctx.clone()))
            .collect();
        let reports: Mutex<Vec<(usize, LaneReport)>> = Mutex::new(Vec::with_capacity(lanes.len()));

        threads.scope(|s| {
            for (index, lane) in lanes.into_iter().enumerate() {
                let reports = &reports;
                s.spawn(move |_| {
                    let report = lane.run();
                    reports
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push((index, report));
                });
            }
        });

        let mut reports = reports
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        reports.sort_by_key(|(index, _)| *index);
        let lanes: Vec<LaneReport> = reports.into_iter().map(|(_, report)| report).collect();

        let not_executed = filtered + lanes.iter().map(|l| l.not_executed).sum::<usize>();
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            submitted,
            token_filtered: unmatched.len(),
            not_executed,
            lanes,
            metrics: self.metrics(),
        };

        if summary.aborted() {
            error!(
                "Run aborted: {} taken, {} not executed",
                summary.items_taken(),
                summary.not_executed
            );
        } else {
            info!(
                "Scheduler finished: {} passed, {} failed, {} lost, {} not executed",
                summary.items_passed(),
                summary.items_failed(),
                summary.items_lost(),
                summary.not_executed
            );
        }
        Ok(summary)
    }

    fn record_not_executed(&self, count: usize) {
        if let Ok(mut m) = self.metrics.write() {
            m.record_not_executed(count);
        }
    }
}
