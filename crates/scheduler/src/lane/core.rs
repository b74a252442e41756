use std::sync::{Arc, RwLock};

use crate::metrics::RunMetrics;
use crate::pool::WorkPool;
use crate::recovery::RecoveryPolicy;
use crate::reporter::NotExecutedReporter;
use crate::sink::{DiagnosticLog, MetricCollector, ResultSink};
use crate::tracker::LaneTracker;
use crate::types::{LaneReport, LaneState};
use crate::worker::Worker;

/// State shared by every lane of one run.
#[derive(Clone)]
pub struct LaneContext {
    pub pool: Arc<WorkPool>,
    pub tracker: Arc<LaneTracker>,
    pub sink: Arc<dyn ResultSink>,
    pub reporter: NotExecutedReporter,
    pub diagnostics: Arc<dyn DiagnosticLog>,
    pub collectors: Vec<Arc<dyn MetricCollector>>,
    pub policy: RecoveryPolicy,
    pub metrics: Arc<RwLock<RunMetrics>>,
}

/// One worker's run loop over the shared pool.
///
/// The lane owns its worker for the whole run. It is consumed by
/// [`run`](Self::run), which returns the lane's [`LaneReport`].
pub struct ExecutionLane {
    pub(super) worker: Box<dyn Worker>,
    pub(super) ctx: LaneContext,
    pub(super) state: LaneState,
    pub(super) report: LaneReport,
}

impl ExecutionLane {
    pub fn new(worker: Box<dyn Worker>, ctx: LaneContext) -> Self {
        let report = LaneReport::new(worker.serial());
        Self {
            worker,
            ctx,
            state: LaneState::Running,
            report,
        }
    }

    pub fn serial(&self) -> &str {
        self.worker.serial()
    }

    pub fn state(&self) -> LaneState {
        self.state
    }
}
