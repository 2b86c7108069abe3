use std::sync::{Arc, RwLock};

use tracing::info;

use tessera_core::ExecutionConfig;
use tessera_graph::NodeTree;

use crate::context::ExecutionContext;
use crate::error::ExecutionError;
use crate::metrics::ExecutionMetrics;
use crate::nodes::{self, Translation};
use crate::passes;

use super::ExecutionSystem;

impl ExecutionSystem {
    /// Build the execution system for `tree`. Nothing runs until
    /// [`ExecutionSystem::execute`].
    pub fn new(
        tree: &NodeTree,
        config: &ExecutionConfig,
        rendering: bool,
        fast_calculation: bool,
    ) -> Result<Self, ExecutionError> {
        let context = ExecutionContext::new(tree, config, rendering, fast_calculation);
        Self::with_context(tree, context)
    }

    pub fn with_context(tree: &NodeTree, context: ExecutionContext) -> Result<Self, ExecutionError> {
        let Translation {
            mut graph,
            dropped_links,
        } = nodes::translate(tree, &context)?;

        let type_conversions = passes::add_type_conversions(&mut graph)?;
        passes::determine_resolutions(&mut graph, &context)?;
        let resolution_conversions = passes::add_resolution_conversions(&mut graph)?;
        let buffering = passes::add_buffers(&mut graph)?;
        info!(
            "Conversions: {} type, {} resolution; buffered {} complex operations ({} write, {} read)",
            type_conversions,
            resolution_conversions,
            buffering.complex_operations,
            buffering.write_buffers,
            buffering.read_buffers
        );

        let grouping = passes::group_operations(&mut graph, &context)?;

        Ok(Self {
            context,
            graph,
            groups: grouping.groups,
            primary_groups: grouping.primary,
            metrics: Arc::new(RwLock::new(ExecutionMetrics::default())),
            dropped_links,
            buffering,
        })
    }
}
