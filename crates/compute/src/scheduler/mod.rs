//! Work schedulers: run the chunk packages of one group and block until
//! they are done.
//!
//! A scheduler instance is owned by the caller and handed to
//! [`crate::ExecutionSystem::execute`], so nothing here is process-global.

pub mod inline;
pub mod threads;
pub mod types;

use tracing::warn;

use tessera_core::{ExecutionConfig, SchedulerKind};

use crate::context::ExecutionContext;
use crate::error::ExecutionError;

pub use inline::InlineScheduler;
pub use threads::ThreadScheduler;
pub use types::{BatchOutcome, StopHandle, WorkPackage};

/// Executes work packages for the execution system.
pub trait WorkScheduler: Send {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Prepare workers for one execution.
    fn start(&mut self, context: &ExecutionContext) -> Result<(), ExecutionError>;

    /// Run `work` once per package and return when the batch has drained.
    /// Packages dequeued after a stop request are abandoned.
    fn schedule_all<'a>(
        &self,
        packages: Vec<WorkPackage>,
        work: &(dyn Fn(&WorkPackage) + Sync + 'a),
    ) -> Result<BatchOutcome, ExecutionError>;

    /// Barrier: block until every package handed out so far has finished.
    fn finish(&self) -> Result<(), ExecutionError>;

    /// Release workers. Safe to call more than once.
    fn stop(&mut self);

    fn has_gpu_devices(&self) -> bool {
        false
    }

    /// Handle other threads can use to cancel the running execution.
    fn stop_handle(&self) -> StopHandle;
}

/// Build the scheduler named by the config.
pub fn create_scheduler(config: &ExecutionConfig) -> Box<dyn WorkScheduler> {
    match config.scheduler {
        SchedulerKind::Threads => Box::new(ThreadScheduler::new(config.resolved_worker_threads())),
        SchedulerKind::Inline => Box::new(InlineScheduler::new()),
        SchedulerKind::Gpu => {
            warn!("No accelerator devices available, falling back to CPU threads");
            Box::new(ThreadScheduler::new(config.resolved_worker_threads()))
        }
    }
}
