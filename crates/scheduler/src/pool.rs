use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use lanepool_core::TokenSet;
use tracing::warn;

use crate::item::WorkItem;

#[derive(Default)]
struct PoolState {
    /// Items any worker can run.
    generic: VecDeque<Box<dyn WorkItem>>,
    /// Items that need a worker offering specific tokens.
    token_gated: VecDeque<Box<dyn WorkItem>>,
}

/// Pending work shared by every lane of a run.
///
/// `take_for` is the only arbiter of who runs what: each item leaves the
/// pool exactly once, either to one lane or through `drain_remaining`.
/// The lock is held only for the queue operation itself.
#[derive(Default)]
pub struct WorkPool {
    state: Mutex<PoolState>,
}

impl WorkPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from items in submission order.
    pub fn from_items(items: impl IntoIterator<Item = Box<dyn WorkItem>>) -> Self {
        let pool = Self::new();
        for item in items {
            pool.push(item);
        }
        pool
    }

    /// Admit an item. Items declaring tokens go to the token-gated queue.
    pub fn push(&self, item: Box<dyn WorkItem>) {
        let mut state = self.lock();
        if item.required_tokens().is_empty() {
            state.generic.push_back(item);
        } else {
            state.token_gated.push_back(item);
        }
    }

    /// Take the next item that needs no tokens.
    pub fn take(&self) -> Option<Box<dyn WorkItem>> {
        self.take_for(|_| false)
    }

    /// Take the next item for a worker that accepts required token sets
    /// according to `has_tokens`, normally [`Worker::has_tokens`](crate::Worker::has_tokens).
    ///
    /// Token-gated items the worker accepts are preferred, so scarce
    /// devices are spent on the work only they can do.
    pub fn take_for(&self, has_tokens: impl Fn(&TokenSet) -> bool) -> Option<Box<dyn WorkItem>> {
        let mut state = self.lock();
        let position = state
            .token_gated
            .iter()
            .position(|item| has_tokens(&item.required_tokens()));
        if let Some(index) = position {
            return state.token_gated.remove(index);
        }
        state.generic.pop_front()
    }

    /// Number of pending items. Observational only; may be stale by the
    /// time the caller looks at it.
    pub fn size(&self) -> usize {
        let state = self.lock();
        state.generic.len() + state.token_gated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Atomically empty the pool, returning generic items first.
    pub fn drain_remaining(&self) -> Vec<Box<dyn WorkItem>> {
        let mut state = self.lock();
        let mut drained: Vec<Box<dyn WorkItem>> = state.generic.drain(..).collect();
        drained.extend(state.token_gated.drain(..));
        drained
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("work pool lock poisoned, continuing with inner state");
            poisoned.into_inner()
        })
    }
}
