use tessera_core::TesseraError;
use tessera_graph::{GraphError, GroupId};

use crate::group::GroupState;

/// Error type for building and running an execution system.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Scheduler failed to start: {0}")]
    SchedulerStart(String),
    #[error("Scheduler not started: {0}")]
    SchedulerNotStarted(String),
    #[error("Invalid transition for {group}: {from:?} -> {to:?}")]
    InvalidTransition {
        group: GroupId,
        from: GroupState,
        to: GroupState,
    },
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Config(#[from] TesseraError),
}
