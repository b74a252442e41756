use lanepool_core::{satisfies, FailureStatus, TokenSet};

use crate::item::WorkItem;
use crate::sink::ResultSink;

/// Classification of a failure raised while running a work item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// Ordinary runtime failure of the item; the worker is healthy.
    #[error("item failed: {0}")]
    Recoverable(String),
    /// The worker was slow or hung but its handle is still usable.
    #[error("worker unresponsive: {0}")]
    WorkerUnresponsive(String),
    /// The worker handle itself is gone.
    #[error("worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl Fault {
    pub fn message(&self) -> &str {
        match self {
            Fault::Recoverable(m) | Fault::WorkerUnresponsive(m) | Fault::WorkerUnavailable(m) => m,
        }
    }

    /// Whether the fault invalidates the lane's worker binding.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Fault::WorkerUnavailable(_))
    }

    /// Failure category reported for the item that raised this fault.
    pub fn failure_status(&self) -> FailureStatus {
        match self {
            Fault::Recoverable(_) => FailureStatus::TestFailure,
            Fault::WorkerUnresponsive(_) => FailureStatus::InfraFailure,
            Fault::WorkerUnavailable(_) => FailureStatus::LostSystemUnderTest,
        }
    }
}

/// Handle to one device a lane is bound to.
///
/// Implementations wrap the actual device connection; the scheduler only
/// needs to run items on it and to ask it to recover.
pub trait Worker: Send {
    /// Device serial, used as the lane's name in logs and reports.
    fn serial(&self) -> &str;

    /// Tokens this device can satisfy.
    fn capabilities(&self) -> TokenSet {
        TokenSet::new()
    }

    /// Whether this device can run an item that requires `required`.
    fn has_tokens(&self, required: &TokenSet) -> bool {
        satisfies(&self.capabilities(), required)
    }

    /// Run one item. Item-level results may be streamed to `sink` with
    /// `on_item_started` / `on_item_ended`; run-level notifications are the
    /// lane's responsibility.
    fn run(&mut self, item: &dyn WorkItem, sink: &dyn ResultSink) -> Result<(), Fault>;

    /// Try to bring the device back (reboot, reacquire). Blocking.
    fn attempt_recovery(&mut self) -> bool;

    fn is_available(&self) -> bool;
}
