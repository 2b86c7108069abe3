use tessera_core::config::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use tessera_core::{ExecutionConfig, Quality, Resolution};
use tessera_graph::{EvaluationContext, NodeTree};

/// Settings for one execution, derived from the node tree, the engine
/// config and the caller's flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub quality: Quality,
    /// Final render (true) or interactive editing (false).
    pub rendering: bool,
    /// Only HIGH priority outputs are executed.
    pub fast_calculation: bool,
    pub chunk_size: u32,
    /// Tree asks for accelerators.
    pub use_gpu: bool,
    /// Accelerators requested and available; set when execution starts.
    pub has_active_gpu: bool,
    pub render_size: Resolution,
    pub preview_size: u32,
    pub worker_threads: usize,
    pub view_transform: String,
    pub display_device: String,
}

impl ExecutionContext {
    pub fn new(
        tree: &NodeTree,
        config: &ExecutionConfig,
        rendering: bool,
        fast_calculation: bool,
    ) -> Self {
        let chunk_size = config
            .chunk_size
            .map(|size| size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE))
            .unwrap_or_else(|| tree.effective_chunk_size());
        Self {
            quality: tree.quality(rendering),
            rendering,
            fast_calculation,
            chunk_size,
            use_gpu: tree.use_gpu && config.use_gpu,
            has_active_gpu: false,
            render_size: tree.render_size,
            preview_size: config.preview_size,
            worker_threads: config.resolved_worker_threads(),
            view_transform: tree.view_transform.clone(),
            display_device: tree.display_device.clone(),
        }
    }

    /// The subset handed to pixel operations at init.
    pub fn evaluation(&self) -> EvaluationContext {
        EvaluationContext {
            quality: self.quality,
            rendering: self.rendering,
        }
    }
}
