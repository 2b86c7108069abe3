use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tessera_core::Priority;
use tessera_graph::{GroupId, OperationKind};

use crate::error::ExecutionError;
use crate::group::GroupState;
use crate::metrics::ExecutionMetrics;
use crate::scheduler::{WorkPackage, WorkScheduler};

use super::{ExecutionReport, ExecutionSystem, OutputImage};

impl ExecutionSystem {
    /// Run the system once on `scheduler`.
    ///
    /// Output groups run by priority tier, HIGH first; fast calculation
    /// stops after HIGH. Each group first runs the buffer groups it reads.
    /// Operations and groups are deinitialized whether or not the run
    /// succeeds.
    pub fn execute(
        &mut self,
        scheduler: &mut dyn WorkScheduler,
    ) -> Result<ExecutionReport, ExecutionError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        self.context.has_active_gpu = scheduler.has_gpu_devices() && self.context.use_gpu;
        info!(
            "Execution {} starting on {} scheduler: {} groups, {} operations{}",
            run_id,
            scheduler.name(),
            self.groups.len(),
            self.graph.operation_count(),
            if self.context.fast_calculation { " (fast)" } else { "" }
        );

        let result = self.run(scheduler);
        self.deinit();
        let outputs = result?;

        let metrics = self.metrics();
        info!(
            "Execution {} finished: {} outputs, {} chunks executed, {} abandoned",
            run_id,
            outputs.len(),
            metrics.chunks_executed,
            metrics.chunks_abandoned
        );
        Ok(ExecutionReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            metrics,
            outputs,
        })
    }

    fn run(&mut self, scheduler: &mut dyn WorkScheduler) -> Result<Vec<OutputImage>, ExecutionError> {
        let readers = self.graph.assign_read_buffer_offsets();
        self.graph.init_operations(&self.context.evaluation());
        self.graph.prime_read_buffers();
        debug!(
            "Initialized {} operations, {} proxies, {} read-buffers",
            self.graph.operation_count(),
            self.graph.proxies().len(),
            readers
        );

        for group in &mut self.groups {
            group.init_execution()?;
        }

        scheduler.start(&self.context)?;
        let scheduled = self.run_tiers(&*scheduler);
        let finished = scheduler.finish();
        scheduler.stop();
        scheduled?;
        finished?;

        Ok(self.collect_outputs())
    }

    fn run_tiers(&mut self, scheduler: &dyn WorkScheduler) -> Result<(), ExecutionError> {
        let tiers: &[Priority] = if self.context.fast_calculation {
            &[Priority::High]
        } else {
            &Priority::ALL
        };
        let mut visited = vec![false; self.groups.len()];

        for &priority in tiers {
            let tier: Vec<GroupId> = self
                .groups
                .iter()
                .filter(|g| g.is_output() && g.priority == priority)
                .map(|g| g.id)
                .collect();
            if tier.is_empty() {
                continue;
            }
            debug!("Running {} {} priority output groups", tier.len(), priority);
            for id in tier {
                self.run_group(id, scheduler, &mut visited)?;
            }
        }
        Ok(())
    }

    fn run_group(
        &mut self,
        id: GroupId,
        scheduler: &dyn WorkScheduler,
        visited: &mut [bool],
    ) -> Result<(), ExecutionError> {
        if visited[id.index()] {
            return Ok(());
        }
        visited[id.index()] = true;

        let dependencies = self.groups[id.index()].dependencies.clone();
        for dependency in dependencies {
            self.run_group(dependency, scheduler, visited)?;
        }
        self.execute_group(id, scheduler)
    }

    fn execute_group(&mut self, id: GroupId, scheduler: &dyn WorkScheduler) -> Result<(), ExecutionError> {
        let index = id.index();
        let priority = self.groups[index].priority;
        if !self.groups[index].is_schedulable() {
            warn!(
                "Skipping {}: degenerate resolution {}",
                id, self.groups[index].resolution
            );
            self.record(|m| m.record_group_skipped(id, priority));
            return Ok(());
        }

        if self.groups[index].prefers_gpu && !self.context.has_active_gpu {
            debug!("{} prefers an accelerator, running on CPU workers", id);
        }
        self.groups[index].begin_execution()?;
        let packages = self.groups[index].work_packages();
        let chunks = packages.len();
        self.record(|m| m.record_group_started(id, priority, chunks));

        let started = Instant::now();
        let outcome = {
            let group = &self.groups[index];
            let graph = &self.graph;
            scheduler.schedule_all(packages, &|package: &WorkPackage| {
                group.render_chunk(graph, &package.rect)
            })?
        };
        let elapsed = started.elapsed();

        if outcome.abandoned == 0 {
            self.groups[index].mark_completed();
        }
        debug!(
            "{} finished in {:?}: {} chunks, {} abandoned",
            id, elapsed, outcome.executed, outcome.abandoned
        );
        self.record(|m| {
            m.record_group_finished(id, priority, outcome.executed, outcome.abandoned, elapsed)
        });
        Ok(())
    }

    fn record(&self, f: impl FnOnce(&mut ExecutionMetrics)) {
        if let Ok(mut metrics) = self.metrics.write() {
            f(&mut metrics);
        }
    }

    fn collect_outputs(&self) -> Vec<OutputImage> {
        self.groups
            .iter()
            .filter(|g| g.is_output() && g.is_completed())
            .filter_map(|g| {
                let op = self.graph.operation(g.sink).ok()?;
                let OperationKind::Output(target) = &op.kind else {
                    return None;
                };
                Some(OutputImage {
                    name: op.name.clone(),
                    role: target.role,
                    priority: target.priority,
                    resolution: op.resolution(),
                    buffer: target.buffer.clone()?,
                })
            })
            .collect()
    }

    fn deinit(&mut self) {
        for group in &mut self.groups {
            if matches!(group.state(), GroupState::Initialized | GroupState::Executing) {
                if let Err(e) = group.deinit_execution() {
                    warn!("Failed to deinitialize {}: {}", group.id, e);
                }
            }
        }
        self.graph.deinit_operations();
        debug!("Execution system deinitialized");
    }
}
