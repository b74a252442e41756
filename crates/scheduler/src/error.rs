use thiserror::Error;

use crate::worker::Fault;

/// Why a single lane stopped before the pool was exhausted.
#[derive(Debug, Clone, Error)]
pub enum LaneError {
    /// Recovery failed while other lanes were still alive; the run continues without this lane.
    #[error("lane {serial} lost its worker: {fault}")]
    WorkerLost { serial: String, fault: Fault },

    /// The last lane lost its worker; remaining work was reported not executed.
    #[error("lane {serial} aborted the run ({not_executed} not executed): {fault}")]
    RunAborted {
        serial: String,
        fault: Fault,
        not_executed: usize,
    },
}

/// Fatal outcome of `Scheduler::run_all`, raised only after every lane has
/// terminated and every submitted item has been accounted for.
#[derive(Debug, Clone, Error)]
pub enum SchedulingError {
    #[error("run aborted by lane {serial} ({not_executed} not executed): {fault}")]
    RunAborted {
        serial: String,
        fault: Fault,
        not_executed: usize,
    },

    #[error("workers lost during run: {}", serials.join(", "))]
    WorkersLost { serials: Vec<String> },

    #[error("no lanes to run {pending} item(s)")]
    NoLanes { pending: usize },
}

impl From<LaneError> for SchedulingError {
    fn from(err: LaneError) -> Self {
        match err {
            LaneError::WorkerLost { serial, .. } => SchedulingError::WorkersLost { serials: vec![serial] },
            LaneError::RunAborted { serial, fault, not_executed } => {
                SchedulingError::RunAborted { serial, fault, not_executed }
            }
        }
    }
}
