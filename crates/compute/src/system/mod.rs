//! Execution system: builds the operation graph for one node tree and runs
//! it group by group, highest priority first.
//!
//! Split into focused submodules:
//! - `build`: translation and graph passes, run once in the constructor
//! - `execution`: init, priority-ordered scheduling, output collection, deinit

mod build;
mod execution;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use tessera_core::{Priority, Resolution};
use tessera_graph::{GroupId, MemoryBuffer, OperationGraph, OperationId, OutputRole};

use crate::context::ExecutionContext;
use crate::group::ExecutionGroup;
use crate::metrics::ExecutionMetrics;
use crate::passes::buffering::BufferingStats;

/// Counts describing a built execution system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub operations: usize,
    pub connections: usize,
    pub proxies: usize,
    pub compute_operations: usize,
    pub type_conversions: usize,
    pub resolution_conversions: usize,
    pub write_buffers: usize,
    pub read_buffers: usize,
    pub outputs: usize,
    pub groups: usize,
    pub output_groups: usize,
    pub buffer_groups: usize,
    pub dropped_links: usize,
    pub chunk_size: u32,
}

/// One executed output and its pixels.
#[derive(Debug, Clone, Serialize)]
pub struct OutputImage {
    pub name: String,
    #[serde(flatten)]
    pub role: OutputRole,
    pub priority: Priority,
    pub resolution: Resolution,
    #[serde(skip)]
    pub buffer: Arc<MemoryBuffer>,
}

/// Result of [`ExecutionSystem::execute`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub metrics: ExecutionMetrics,
    pub outputs: Vec<OutputImage>,
}

impl ExecutionReport {
    pub fn output(&self, name: &str) -> Option<&OutputImage> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// Owns the operation graph, groups and metrics of one execution.
pub struct ExecutionSystem {
    pub(super) context: ExecutionContext,
    pub(super) graph: OperationGraph,
    pub(super) groups: Vec<ExecutionGroup>,
    pub(super) primary_groups: Vec<Option<GroupId>>,
    pub(super) metrics: Arc<RwLock<ExecutionMetrics>>,
    pub(super) dropped_links: usize,
    pub(super) buffering: BufferingStats,
}

impl ExecutionSystem {
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn graph(&self) -> &OperationGraph {
        &self.graph
    }

    pub fn groups(&self) -> &[ExecutionGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&ExecutionGroup> {
        self.groups.get(id.index())
    }

    /// First group that claimed the operation during grouping.
    pub fn primary_group(&self, op: OperationId) -> Option<GroupId> {
        self.primary_groups.get(op.index()).copied().flatten()
    }

    pub fn buffering_stats(&self) -> BufferingStats {
        self.buffering
    }

    /// Snapshot of the current metrics.
    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> GraphSummary {
        let stats = self.graph.stats();
        let output_groups = self.groups.iter().filter(|g| g.is_output()).count();
        GraphSummary {
            operations: stats.operation_count,
            connections: stats.connection_count,
            proxies: stats.proxy_count,
            compute_operations: stats.compute_operations,
            type_conversions: stats.type_conversions,
            resolution_conversions: stats.resolution_conversions,
            write_buffers: stats.write_buffers,
            read_buffers: stats.read_buffers,
            outputs: stats.outputs,
            groups: self.groups.len(),
            output_groups,
            buffer_groups: self.groups.len() - output_groups,
            dropped_links: self.dropped_links,
            chunk_size: self.context.chunk_size,
        }
    }
}
