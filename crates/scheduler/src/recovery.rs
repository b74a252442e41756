use tracing::{info, warn};

use crate::tracker::LaneTracker;
use crate::worker::Worker;

/// What a lane does after its worker became unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Other lanes are still running: try to get the worker back and continue.
    AttemptRecovery,
    /// This is the last lane: stop, drain the pool and abort the run.
    AbortRun,
}

/// Recover-or-abort policy applied when a lane loses its worker.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    max_attempts: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

impl RecoveryPolicy {
    /// `max_attempts` of 0 disables recovery: non-last lanes give up their worker immediately.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn decide(&self, tracker: &LaneTracker) -> RecoveryDecision {
        if tracker.is_last_lane_alive() {
            RecoveryDecision::AbortRun
        } else {
            RecoveryDecision::AttemptRecovery
        }
    }

    /// Try to recover `worker`, returning whether it is usable again.
    pub fn recover(&self, worker: &mut dyn Worker) -> bool {
        for attempt in 1..=self.max_attempts {
            if worker.attempt_recovery() && worker.is_available() {
                info!(lane = %worker.serial(), attempt, "worker recovered");
                return true;
            }
            warn!(
                lane = %worker.serial(),
                attempt,
                max_attempts = self.max_attempts,
                "worker recovery attempt failed"
            );
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::WorkItem;
    use crate::sink::ResultSink;
    use crate::worker::Fault;

    struct FlakyWorker {
        succeed_on: u32,
        attempts: u32,
        available: bool,
    }

    impl Worker for FlakyWorker {
        fn serial(&self) -> &str {
            "flaky-1"
        }

        fn run(&mut self, _item: &dyn WorkItem, _sink: &dyn ResultSink) -> Result<(), Fault> {
            Ok(())
        }

        fn attempt_recovery(&mut self) -> bool {
            self.attempts += 1;
            self.available = self.attempts >= self.succeed_on;
            self.available
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    #[test]
    fn last_lane_aborts() {
        let tracker = LaneTracker::new();
        tracker.register_lanes(1);
        assert_eq!(RecoveryPolicy::default().decide(&tracker), RecoveryDecision::AbortRun);
    }

    #[test]
    fn other_lanes_alive_means_recover() {
        let tracker = LaneTracker::new();
        tracker.register_lanes(2);
        assert_eq!(RecoveryPolicy::default().decide(&tracker), RecoveryDecision::AttemptRecovery);
    }

    #[test]
    fn zero_attempts_never_recovers() {
        assert_eq!(RecoveryPolicy::default().max_attempts(), 1);
        let policy = RecoveryPolicy::new(0);
        assert_eq!(policy.max_attempts(), 0);
        let mut worker = FlakyWorker { succeed_on: 1, attempts: 0, available: false };
        assert!(!policy.recover(&mut worker));
        assert_eq!(worker.attempts, 0);
    }

    #[test]
    fn retries_up_to_max_attempts() {
        let mut worker = FlakyWorker { succeed_on: 3, attempts: 0, available: false };
        assert!(!RecoveryPolicy::new(2).recover(&mut worker));
        assert_eq!(worker.attempts, 2);

        let mut worker = FlakyWorker { succeed_on: 3, attempts: 0, available: false };
        assert!(RecoveryPolicy::new(3).recover(&mut worker));
        assert_eq!(worker.attempts, 3);
    }

    #[test]
    fn zero_attempts_never_touches_worker() {
        let mut worker = FlakyWorker { succeed_on: 1, attempts: 0, available: false };
        assert!(!RecoveryPolicy::new(0).recover(&mut worker));
        assert_eq!(worker.attempts, 0);
    }
}
