use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{LaneError, SchedulingError};
use crate::metrics::RunMetrics;

/// Execution lane state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LaneState {
    /// Pulling and running items.
    Running,
    /// Worker lost; deciding between recovery and abort.
    Recovering,
    /// Run loop exited.
    Terminated,
}

/// How a lane's run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LaneOutcome {
    /// Pool exhausted.
    Completed,
    /// Worker lost and could not be recovered while other lanes were alive.
    WorkerLost,
    /// Last lane lost its worker and aborted the run.
    Aborted,
}

/// Per-lane accounting, produced when a lane terminates.
#[derive(Debug, Clone, Serialize)]
pub struct LaneReport {
    /// Serial of the worker the lane was bound to.
    pub serial: String,
    pub outcome: LaneOutcome,
    pub final_state: LaneState,
    /// Items this lane took from the pool.
    pub items_taken: usize,
    pub items_passed: usize,
    /// Items that ran and failed (test failure or unresponsive worker).
    pub items_failed: usize,
    /// Items in flight when the worker became unavailable.
    pub items_lost: usize,
    pub recoveries: usize,
    /// Not-executed records this lane emitted while draining the pool.
    pub not_executed: usize,
    /// Rendered fault that ended the lane early, if any.
    pub fault: Option<String>,
    #[serde(skip)]
    pub error: Option<LaneError>,
}

impl LaneReport {
    pub(crate) fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            outcome: LaneOutcome::Completed,
            final_state: LaneState::Running,
            items_taken: 0,
            items_passed: 0,
            items_failed: 0,
            items_lost: 0,
            recoveries: 0,
            not_executed: 0,
            fault: None,
            error: None,
        }
    }

    pub(crate) fn fail(&mut self, outcome: LaneOutcome, error: LaneError) {
        self.outcome = outcome;
        self.fault = Some(error.to_string());
        self.error = Some(error);
    }
}

/// Accounting for a whole `run_all` call.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Items submitted to the scheduler.
    pub submitted: usize,
    /// Items removed before the run because no worker matched their tokens.
    pub token_filtered: usize,
    /// All not-executed records emitted, including token filtering.
    pub not_executed: usize,
    pub lanes: Vec<LaneReport>,
    pub metrics: RunMetrics,
}

impl RunSummary {
    pub fn items_taken(&self) -> usize {
        self.lanes.iter().map(|l| l.items_taken).sum()
    }

    pub fn items_passed(&self) -> usize {
        self.lanes.iter().map(|l| l.items_passed).sum()
    }

    pub fn items_failed(&self) -> usize {
        self.lanes.iter().map(|l| l.items_failed).sum()
    }

    pub fn items_lost(&self) -> usize {
        self.lanes.iter().map(|l| l.items_lost).sum()
    }

    pub fn aborted(&self) -> bool {
        self.lanes.iter().any(|l| l.outcome == LaneOutcome::Aborted)
    }

    /// Serials of lanes that lost their worker without aborting the run.
    pub fn lost_workers(&self) -> Vec<String> {
        self.lanes
            .iter()
            .filter(|l| l.outcome == LaneOutcome::WorkerLost)
            .map(|l| l.serial.clone())
            .collect()
    }

    /// The error `run_all` reports for this run: an abort wins over lost
    /// workers, and a run where every lane completed has none.
    pub fn error(&self) -> Option<SchedulingError> {
        let aborted = self.lanes.iter().find_map(|l| match &l.error {
            Some(err @ LaneError::RunAborted { .. }) => Some(err.clone()),
            _ => None,
        });
        if let Some(err) = aborted {
            return Some(err.into());
        }
        let lost = self.lost_workers();
        if lost.is_empty() {
            None
        } else {
            Some(SchedulingError::WorkersLost { serials: lost })
        }
    }
}
