//! Operation graph for the tiled compositor.
//!
//! Holds the authored [`NodeTree`] input model and the [`OperationGraph`]
//! arena the execution system rewrites and runs: operations addressed by
//! stable indices, connections stored as socket-reference pairs, and memory
//! proxies that hand buffers from a write-buffer to its read-buffers.

pub mod buffer;
pub mod error;
pub mod ids;
pub mod operation;
pub mod resolution;
pub mod sample;
pub mod store;
pub mod tree;

pub use buffer::{MemoryBuffer, MemoryProxy};
pub use error::GraphError;
pub use ids::{ConnectionId, GroupId, OperationId, ProxyId, SocketRef};
pub use operation::{
    Connection, EvaluationContext, InputSocket, InputSpec, Operation, OperationFlags,
    OperationKind, OutputRole, OutputSocket, OutputTarget, PixelOperation, ResolutionRule,
};
pub use sample::{InputSampler, convert_pixel};
pub use store::{GraphStats, OperationGraph};
pub use tree::{BlendMode, Link, Node, NodeKind, NodeTree};
