//! Tiled execution of compositing node trees.
//!
//! [`ExecutionSystem::new`] translates a [`tessera_graph::NodeTree`] into an
//! operation graph, inserts type and resolution conversions, buffers complex
//! operations and groups everything into independently schedulable units.
//! [`ExecutionSystem::execute`] then runs those groups chunk by chunk on a
//! [`WorkScheduler`], highest priority first.

pub mod context;
pub mod error;
pub mod group;
pub mod metrics;
pub mod nodes;
pub mod passes;
pub mod scheduler;
pub mod system;

pub use context::ExecutionContext;
pub use error::ExecutionError;
pub use group::{ExecutionGroup, GroupKind, GroupState};
pub use metrics::{ExecutionEvent, ExecutionMetrics};
pub use scheduler::{
    create_scheduler, BatchOutcome, InlineScheduler, StopHandle, ThreadScheduler, WorkPackage,
    WorkScheduler,
};
pub use system::{ExecutionReport, ExecutionSystem, GraphSummary, OutputImage};
