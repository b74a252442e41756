//! Shared test-pool scheduler.
//!
//! A fixed set of [`ExecutionLane`]s, one per worker device, pull
//! [`WorkItem`]s from a single [`WorkPool`] until it is empty. A lane whose
//! worker disappears recovers it when other lanes are still alive; the last
//! lane standing instead drains the pool into not-executed reports and aborts
//! the run, so every submitted item is accounted for.

pub mod error;
pub mod item;
pub mod lane;
pub mod metrics;
pub mod pool;
pub mod recovery;
pub mod reporter;
pub mod runner;
pub mod sink;
#[cfg(test)]
pub(crate) mod testing;
pub mod tracker;
pub mod types;
pub mod worker;

pub use error::{LaneError, SchedulingError};
pub use item::WorkItem;
pub use lane::{ExecutionLane, LaneContext};
pub use metrics::RunMetrics;
pub use pool::WorkPool;
pub use recovery::{RecoveryDecision, RecoveryPolicy};
pub use reporter::NotExecutedReporter;
pub use runner::Scheduler;
pub use sink::{
    DiagnosticLog, EventType, LogLevel, MetricCollector, ResultSink, TracingDiagnosticLog,
};
pub use tracker::LaneTracker;
pub use types::{LaneOutcome, LaneReport, LaneState, RunSummary};
pub use worker::{Fault, Worker};
