//! Execution lane -- one per worker device.
//!
//! Split into focused submodules:
//! - `core`: ExecutionLane struct, shared lane context, and constructor
//! - `execution`: the take/run/classify loop and its recovery/abort exits

mod core;
mod execution;

pub use self::core::{ExecutionLane, LaneContext};
