use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

/// Counts the lanes of a run that have not terminated yet.
///
/// Set once with [`register_lanes`](Self::register_lanes), then only ever
/// decremented, once per lane.
#[derive(Debug, Default)]
pub struct LaneTracker {
    remaining: AtomicUsize,
}

impl LaneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial lane count. Must happen before any lane starts.
    pub fn register_lanes(&self, n: usize) {
        self.remaining.store(n, Ordering::SeqCst);
    }

    /// Record that a lane terminated and return how many are still running.
    pub fn lane_finished(&self) -> usize {
        let result = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match result {
            Ok(previous) => previous - 1,
            Err(_) => {
                warn!("lane_finished called with no lanes registered");
                0
            }
        }
    }

    /// True when the caller is the only lane still running.
    pub fn is_last_lane_alive(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) == 1
    }

    /// Lanes still running. Observational only.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}
