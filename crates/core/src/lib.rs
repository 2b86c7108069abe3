pub mod config;
pub mod error;
pub mod types;

pub use config::{ExecutionConfig, SchedulerKind};
pub use error::*;
pub use types::*;
