use tracing::debug;

use crate::context::ExecutionContext;
use crate::error::ExecutionError;

use super::types::{BatchOutcome, StopHandle, WorkPackage};
use super::WorkScheduler;

/// Runs every package on the calling thread, in order.
#[derive(Debug, Default)]
pub struct InlineScheduler {
    stop: StopHandle,
    started: bool,
}

impl InlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkScheduler for InlineScheduler {
    fn name(&self) -> &str {
        "inline"
    }

    fn start(&mut self, _context: &ExecutionContext) -> Result<(), ExecutionError> {
        self.stop.reset();
        self.started = true;
        debug!("Inline scheduler started");
        Ok(())
    }

    fn schedule_all<'a>(
        &self,
        packages: Vec<WorkPackage>,
        work: &(dyn Fn(&WorkPackage) + Sync + 'a),
    ) -> Result<BatchOutcome, ExecutionError> {
        if !self.started {
            return Err(ExecutionError::SchedulerNotStarted(self.name().to_string()));
        }
        let mut outcome = BatchOutcome::default();
        for package in &packages {
            if self.stop.is_stopped() {
                outcome.abandoned += 1;
                continue;
            }
            work(package);
            outcome.executed += 1;
        }
        Ok(outcome)
    }

    fn finish(&self) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.stop();
        self.started = false;
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}
