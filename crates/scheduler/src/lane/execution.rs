use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use lanepool_core::{
    format_tokens, Metrics, NOT_EXECUTED_DEVICE_UNAVAILABLE, NOT_EXECUTED_NO_MATCHING_DEVICE,
};
use tracing::{debug, error, info, warn};

use crate::error::LaneError;
use crate::item::WorkItem;
use crate::recovery::RecoveryDecision;
use crate::sink::{EventType, LogLevel};
use crate::types::{LaneOutcome, LaneReport, LaneState};
use crate::worker::Fault;

use super::ExecutionLane;

impl ExecutionLane {
    /// Run the lane until the pool is exhausted or its worker is lost for good.
    ///
    /// Calls `LaneTracker::lane_finished` exactly once before returning.
    pub fn run(mut self) -> LaneReport {
        info!(
            lane = %self.serial(),
            tokens = %format_tokens(&self.worker.capabilities()),
            "lane started"
        );

        let mut fault: Option<Fault> = None;
        loop {
            match self.state {
                LaneState::Running => {
                    let worker = &self.worker;
                    let next = self.ctx.pool.take_for(|required| worker.has_tokens(required));
                    let Some(item) = next else {
                        self.complete();
                        continue;
                    };
                    self.report.items_taken += 1;
                    fault = self.execute(item.as_ref());
                    if fault.is_some() {
                        self.state = LaneState::Recovering;
                    }
                }
                LaneState::Recovering => {
                    let Some(current) = fault.take() else {
                        self.state = LaneState::Running;
                        continue;
                    };
                    self.recover_or_abort(current);
                }
                LaneState::Terminated => break,
            }
        }

        self.report.final_state = self.state;
        self.report
    }

    /// Run one item on the bound worker. Returns the fault when it is fatal
    /// to the worker binding; every other outcome is fully reported here.
    fn execute(&mut self, item: &dyn WorkItem) -> Option<Fault> {
        let id = item.id().to_string();
        debug!(lane = %self.serial(), item = %id, "running item");

        self.ctx.sink.on_run_started(&id, item.test_count());
        for collector in &self.ctx.collectors {
            collector.on_item_started(&id);
        }

        let start = Instant::now();
        let result = self.worker.run(item, self.ctx.sink.as_ref());
        let elapsed = start.elapsed();

        let mut metrics = Metrics::new();
        for collector in &self.ctx.collectors {
            collector.on_item_ended(&id, &mut metrics);
        }
        self.record_execution(elapsed);

        let fatal = match result {
            Ok(()) => {
                self.report.items_passed += 1;
                None
            }
            Err(fault) => {
                self.record_fault(&fault);
                match &fault {
                    Fault::Recoverable(_) => {
                        self.report.items_failed += 1;
                        warn!(lane = %self.serial(), item = %id, error = %fault, "item failed, lane continues");
                    }
                    Fault::WorkerUnresponsive(_) => {
                        self.report.items_failed += 1;
                        warn!(lane = %self.serial(), item = %id, error = %fault, "worker unresponsive, lane continues");
                    }
                    Fault::WorkerUnavailable(_) => {
                        self.report.items_lost += 1;
                        error!(lane = %self.serial(), item = %id, error = %fault, "worker unavailable");
                    }
                }
                self.ctx
                    .sink
                    .on_run_failed(&id, fault.message(), fault.failure_status());
                fault.is_fatal().then_some(fault)
            }
        };

        self.ctx.sink.on_run_ended(duration_ms(elapsed), &metrics);
        fatal
    }

    fn recover_or_abort(&mut self, fault: Fault) {
        match self.ctx.policy.decide(&self.ctx.tracker) {
            RecoveryDecision::AttemptRecovery => {
                info!(lane = %self.serial(), "other lanes still running, attempting recovery");
                if self.ctx.policy.recover(self.worker.as_mut()) {
                    self.report.recoveries += 1;
                    if let Ok(mut m) = self.ctx.metrics.write() {
                        m.record_recovery();
                    }
                    self.state = LaneState::Running;
                } else {
                    self.give_up(fault);
                }
            }
            RecoveryDecision::AbortRun => {
                let not_executed = self.drain(NOT_EXECUTED_DEVICE_UNAVAILABLE);
                self.ctx.tracker.lane_finished();
                self.abort(fault, not_executed);
            }
        }
    }

    /// Pool exhausted for this worker: leave the run normally.
    fn complete(&mut self) {
        self.state = LaneState::Terminated;
        let remaining = self.ctx.tracker.lane_finished();
        info!(
            lane = %self.serial(),
            taken = self.report.items_taken,
            remaining_lanes = remaining,
            "lane finished, pool exhausted"
        );
        if remaining == 0 {
            // Whatever is left needs tokens no surviving worker offers.
            let leftover = self.drain(NOT_EXECUTED_NO_MATCHING_DEVICE);
            if leftover > 0 {
                warn!(lane = %self.serial(), leftover, "no live lane could take remaining token-gated items");
            }
        }
    }

    /// Recovery failed while other lanes were alive.
    fn give_up(&mut self, fault: Fault) {
        self.state = LaneState::Terminated;
        let remaining = self.ctx.tracker.lane_finished();
        if remaining == 0 {
            // Every other lane left while this one was recovering.
            let not_executed = self.drain(NOT_EXECUTED_DEVICE_UNAVAILABLE);
            self.abort(fault, not_executed);
            return;
        }
        warn!(
            lane = %self.serial(),
            remaining_lanes = remaining,
            error = %fault,
            "worker could not be recovered, lane terminated"
        );
        let serial = self.serial().to_string();
        self.report
            .fail(LaneOutcome::WorkerLost, LaneError::WorkerLost { serial, fault });
    }

    /// Last-lane abort. The pool has already been drained and the lane
    /// already counted out of the tracker.
    fn abort(&mut self, fault: Fault, not_executed: usize) {
        self.state = LaneState::Terminated;
        let serial = self.serial().to_string();

        let mut metadata = BTreeMap::new();
        metadata.insert("serial".to_string(), serial.clone());
        metadata.insert("fault".to_string(), fault.to_string());
        metadata.insert("not_executed".to_string(), not_executed.to_string());
        metadata.insert("items_taken".to_string(), self.report.items_taken.to_string());
        self.ctx
            .diagnostics
            .log_event(LogLevel::Debug, EventType::SchedulerEarlyTermination, &metadata);

        error!(
            lane = %serial,
            not_executed,
            error = %fault,
            "last lane lost its worker, aborting run"
        );
        self.report.fail(
            LaneOutcome::Aborted,
            LaneError::RunAborted { serial, fault, not_executed },
        );
    }

    /// Drain the pool into not-executed reports. Returns the records emitted.
    fn drain(&mut self, reason: &str) -> usize {
        let remaining = self.ctx.pool.drain_remaining();
        let emitted = self.ctx.reporter.report(&remaining, reason);
        self.report.not_executed += emitted;
        if let Ok(mut m) = self.ctx.metrics.write() {
            m.record_not_executed(emitted);
        }
        emitted
    }

    fn record_execution(&self, elapsed: Duration) {
        if let Ok(mut m) = self.ctx.metrics.write() {
            m.record_execution(self.serial(), elapsed);
        }
    }

    fn record_fault(&self, fault: &Fault) {
        let kind = match fault {
            Fault::Recoverable(_) => "recoverable",
            Fault::WorkerUnresponsive(_) => "worker_unresponsive",
            Fault::WorkerUnavailable(_) => "worker_unavailable",
        };
        if let Ok(mut m) = self.ctx.metrics.write() {
            m.record_fault(kind);
        }
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
