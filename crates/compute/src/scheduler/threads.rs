use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::ExecutionContext;
use crate::error::ExecutionError;

use super::types::{BatchOutcome, PendingWork, StopHandle, WorkPackage};
use super::WorkScheduler;

/// Fixed pool of CPU worker threads backed by `rayon`.
pub struct ThreadScheduler {
    workers: usize,
    pool: Option<rayon::ThreadPool>,
    stop: StopHandle,
    pending: Arc<PendingWork>,
}

impl ThreadScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            pool: None,
            stop: StopHandle::default(),
            pending: Arc::new(PendingWork::default()),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl WorkScheduler for ThreadScheduler {
    fn name(&self) -> &str {
        "threads"
    }

    fn start(&mut self, context: &ExecutionContext) -> Result<(), ExecutionError> {
        self.stop.reset();
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("tessera-worker-{i}"))
            .build()
            .map_err(|e| ExecutionError::SchedulerStart(e.to_string()))?;
        info!(
            "Thread scheduler started with {} workers (chunk size {})",
            self.workers, context.chunk_size
        );
        self.pool = Some(pool);
        Ok(())
    }

    fn schedule_all<'a>(
        &self,
        packages: Vec<WorkPackage>,
        work: &(dyn Fn(&WorkPackage) + Sync + 'a),
    ) -> Result<BatchOutcome, ExecutionError> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| ExecutionError::SchedulerNotStarted(self.name().to_string()))?;

        let executed = AtomicUsize::new(0);
        let abandoned = AtomicUsize::new(0);
        self.pending.add(packages.len())?;

        pool.scope(|scope| {
            for package in &packages {
                let (executed, abandoned) = (&executed, &abandoned);
                let (stop, pending) = (&self.stop, &self.pending);
                scope.spawn(move |_| {
                    if stop.is_stopped() {
                        abandoned.fetch_add(1, Ordering::Relaxed);
                    } else {
                        work(package);
                        executed.fetch_add(1, Ordering::Relaxed);
                    }
                    pending.done();
                });
            }
        });

        let outcome = BatchOutcome {
            executed: executed.into_inner(),
            abandoned: abandoned.into_inner(),
        };
        if outcome.abandoned > 0 {
            warn!("Abandoned {} queued packages after stop", outcome.abandoned);
        }
        Ok(outcome)
    }

    fn finish(&self) -> Result<(), ExecutionError> {
        self.pending.wait_idle()
    }

    fn stop(&mut self) {
        self.stop.stop();
        if self.pool.take().is_some() {
            debug!("Thread scheduler stopped");
        }
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}
