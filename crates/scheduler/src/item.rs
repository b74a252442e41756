use lanepool_core::TokenSet;

/// A unit of test work the scheduler can hand to a lane.
///
/// Items are moved into the [`WorkPool`](crate::WorkPool) as `Box<dyn WorkItem>`
/// and moved out again by exactly one lane; the scheduler never clones them.
pub trait WorkItem: Send + Sync {
    /// Stable identifier, used as the run name in every notification.
    fn id(&self) -> &str;

    /// Capability tokens a worker must offer to run this item. Empty by default.
    fn required_tokens(&self) -> TokenSet {
        TokenSet::new()
    }

    /// Number of tests the item declares, reported with `on_run_started`.
    fn test_count(&self) -> usize {
        1
    }

    /// Independently enumerable members of a composite item.
    ///
    /// When an item that never ran is reported, each returned id gets its own
    /// not-executed record instead of one aggregate record for the item.
    fn split_for_reporting(&self) -> Option<Vec<String>> {
        None
    }
}

impl std::fmt::Debug for dyn WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem").field("id", &self.id()).finish()
    }
}
