pub mod config;
pub mod error;
pub mod failure;
pub mod token;

pub use config::SchedulerConfig;
pub use error::*;
pub use failure::*;
pub use token::*;
