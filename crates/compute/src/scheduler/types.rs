use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use serde::Serialize;

use tessera_core::Rect;
use tessera_graph::GroupId;

use crate::error::ExecutionError;

/// One chunk of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkPackage {
    pub group: GroupId,
    /// Row-major position within the group.
    pub index: usize,
    pub rect: Rect,
}

/// What happened to a batch of packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub executed: usize,
    /// Dequeued after a stop request and dropped without running.
    pub abandoned: usize,
}

/// Shared stop flag. Packages already running finish; queued ones are
/// abandoned once it is set.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Count of packages handed out but not yet finished.
#[derive(Debug, Default)]
pub(crate) struct PendingWork {
    count: Mutex<usize>,
    idle: Condvar,
}

impl PendingWork {
    pub(crate) fn add(&self, n: usize) -> Result<(), ExecutionError> {
        let mut count = self
            .count
            .lock()
            .map_err(|e| ExecutionError::LockPoisoned(format!("pending work: {}", e)))?;
        *count += n;
        Ok(())
    }

    pub(crate) fn done(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.idle.notify_all();
            }
        }
    }

    /// Block until every handed-out package has finished.
    pub(crate) fn wait_idle(&self) -> Result<(), ExecutionError> {
        let count = self
            .count
            .lock()
            .map_err(|e| ExecutionError::LockPoisoned(format!("pending work: {}", e)))?;
        let _idle = self
            .idle
            .wait_while(count, |c| *c > 0)
            .map_err(|e| ExecutionError::LockPoisoned(format!("pending work: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_handle_is_shared() {
        let handle = StopHandle::default();
        let clone = handle.clone();
        clone.stop();
        assert!(handle.is_stopped());
        handle.reset();
        assert!(!clone.is_stopped());
    }

    #[test]
    fn pending_work_drains() {
        let pending = PendingWork::default();
        pending.add(2).unwrap();
        pending.done();
        pending.done();
        pending.wait_idle().unwrap();
    }
}
