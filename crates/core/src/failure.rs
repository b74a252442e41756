use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key/value metrics attached to item and run completion.
pub type Metrics = BTreeMap<String, String>;

/// Reason attached to work that never reached a worker because the run collapsed.
pub const NOT_EXECUTED_DEVICE_UNAVAILABLE: &str = "Test did not run due to device not available.";

/// Reason attached to work no device in the fleet can satisfy.
pub const NOT_EXECUTED_NO_MATCHING_DEVICE: &str = "no device matches required token set";

/// Failure category carried by every failed-run notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureStatus {
    /// The work item ran and its own assertions failed.
    TestFailure,
    /// The work item was scheduled but never ran.
    NotExecuted,
    /// The device under test went away while the item was running.
    LostSystemUnderTest,
    /// Harness or device instability unrelated to the item under test.
    InfraFailure,
}

impl FailureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStatus::TestFailure => "TEST_FAILURE",
            FailureStatus::NotExecuted => "NOT_EXECUTED",
            FailureStatus::LostSystemUnderTest => "LOST_SYSTEM_UNDER_TEST",
            FailureStatus::InfraFailure => "INFRA_FAILURE",
        }
    }
}

impl fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
