//! Built-in pixel operations and translation of an authored [`NodeTree`]
//! into the operation arena.
//!
//! One node may become several operations: a node with `show_preview` also
//! emits a preview output while editing, and a muted node is replaced by a
//! pass-through that forwards its first matching input.

pub mod color;
pub mod filter;
pub mod sources;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use tessera_core::{DataType, Pixel, Resolution, TRANSPARENT};
use tessera_graph::{
    GraphError, InputSampler, InputSpec, Link, Node, NodeKind, NodeTree, Operation, OperationGraph,
    OperationId, OutputRole, PixelOperation, ResolutionRule, SocketRef,
};

use crate::context::ExecutionContext;

pub use color::{BrightnessOp, InvertOp, MixOp};
pub use filter::BlurOp;
pub use sources::{CheckerOp, GradientOp, RgbOp, ValueOp};

/// Result of translating a node tree.
#[derive(Debug)]
pub struct Translation {
    pub graph: OperationGraph,
    /// Links that referenced missing sockets, were duplicates, or closed a cycle.
    pub dropped_links: usize,
}

/// Pixel operation implementing a non-output node kind.
pub fn pixel_operation(kind: &NodeKind) -> Option<Arc<dyn PixelOperation>> {
    let op: Arc<dyn PixelOperation> = match kind {
        NodeKind::Value { value } => Arc::new(ValueOp { value: *value }),
        NodeKind::Rgb { color } => Arc::new(RgbOp { color: *color }),
        NodeKind::Checker {
            width,
            height,
            cell,
        } => Arc::new(CheckerOp {
            resolution: Resolution::new(*width, *height),
            cell: *cell,
        }),
        NodeKind::Gradient { width, height } => Arc::new(GradientOp {
            resolution: Resolution::new(*width, *height),
        }),
        NodeKind::Mix { blend, factor } => Arc::new(MixOp {
            blend: *blend,
            factor: *factor,
        }),
        NodeKind::Invert => Arc::new(InvertOp),
        NodeKind::Brightness { offset } => Arc::new(BrightnessOp { offset: *offset }),
        NodeKind::Blur { radius } => Arc::new(BlurOp::new(*radius)),
        NodeKind::Custom(op) => Arc::clone(op),
        NodeKind::Composite | NodeKind::Viewer { .. } => return None,
    };
    Some(op)
}

/// Stand-in for a muted node: same sockets, each output forwards the first
/// input of the same data type (or the first input).
#[derive(Debug)]
pub struct PassThroughOp {
    name: String,
    inputs: Vec<InputSpec>,
    outputs: Vec<DataType>,
    rule: ResolutionRule,
}

impl PassThroughOp {
    pub fn wrap(inner: &dyn PixelOperation) -> Self {
        let inputs = inner.inputs();
        let outputs = inner.outputs();
        let rule = if inputs.is_empty() {
            inner.resolution_rule()
        } else {
            ResolutionRule::MainInput(forwarded_input(&inputs, &outputs, 0))
        };
        Self {
            name: format!("Muted{}", inner.name()),
            inputs,
            outputs,
            rule,
        }
    }
}

fn forwarded_input(inputs: &[InputSpec], outputs: &[DataType], output: usize) -> usize {
    outputs
        .get(output)
        .and_then(|dt| inputs.iter().position(|spec| spec.data_type == *dt))
        .unwrap_or(0)
}

impl PixelOperation for PassThroughOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<InputSpec> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<DataType> {
        self.outputs.clone()
    }

    fn resolution_rule(&self) -> ResolutionRule {
        self.rule
    }

    fn evaluate(&self, output: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel {
        if self.inputs.is_empty() {
            return TRANSPARENT;
        }
        inputs.sample(forwarded_input(&self.inputs, &self.outputs, output), x, y)
    }
}

#[derive(Debug, Default)]
struct NodeSockets {
    inputs: Vec<SocketRef>,
    outputs: Vec<SocketRef>,
    muted_output: bool,
}

struct TreeTranslator<'a> {
    context: &'a ExecutionContext,
    graph: OperationGraph,
    sockets: IndexMap<String, NodeSockets>,
    dropped_links: usize,
}

/// Translate authored nodes and links into operations and connections.
pub fn translate(tree: &NodeTree, context: &ExecutionContext) -> Result<Translation, GraphError> {
    tree.validate()?;
    let mut translator = TreeTranslator {
        context,
        graph: OperationGraph::new(),
        sockets: IndexMap::new(),
        dropped_links: 0,
    };
    for node in &tree.nodes {
        translator.add_node(node)?;
    }
    for link in &tree.links {
        translator.add_link(link);
    }
    info!(
        "Translated {} nodes into {} operations, {} connections ({} links dropped)",
        tree.nodes.len(),
        translator.graph.operation_count(),
        translator.graph.connection_count(),
        translator.dropped_links
    );
    Ok(Translation {
        graph: translator.graph,
        dropped_links: translator.dropped_links,
    })
}

impl TreeTranslator<'_> {
    fn add_node(&mut self, node: &Node) -> Result<(), GraphError> {
        let sockets = match &node.kind {
            NodeKind::Composite => self.add_output(
                node,
                OutputRole::Composite,
                ResolutionRule::Render(self.context.render_size),
            ),
            NodeKind::Viewer { active } => self.add_output(
                node,
                OutputRole::Viewer { active: *active },
                ResolutionRule::MainInput(0),
            ),
            kind => {
                let Some(inner) = pixel_operation(kind) else {
                    return Ok(());
                };
                self.add_compute(node, inner)?
            }
        };
        self.sockets.insert(node.name.clone(), sockets);
        Ok(())
    }

    fn add_output(&mut self, node: &Node, role: OutputRole, rule: ResolutionRule) -> NodeSockets {
        if node.muted {
            debug!("Skipping muted output node '{}'", node.name);
            return NodeSockets {
                muted_output: true,
                ..Default::default()
            };
        }
        let mut op = Operation::output(node.name.clone(), role, rule).with_origin(&node.name);
        if let Some(priority) = node.priority {
            op = op.with_priority(priority);
        }
        let id = self.graph.add_operation(op);
        NodeSockets {
            inputs: vec![SocketRef::new(id, 0)],
            outputs: Vec::new(),
            muted_output: false,
        }
    }

    fn add_compute(
        &mut self,
        node: &Node,
        inner: Arc<dyn PixelOperation>,
    ) -> Result<NodeSockets, GraphError> {
        let inner: Arc<dyn PixelOperation> = if node.muted {
            Arc::new(PassThroughOp::wrap(inner.as_ref()))
        } else {
            inner
        };
        let id = self
            .graph
            .add_operation(Operation::compute(inner).with_origin(&node.name));
        let op = self.graph.operation(id)?;
        let sockets = NodeSockets {
            inputs: (0..op.inputs.len()).map(|i| SocketRef::new(id, i)).collect(),
            outputs: (0..op.outputs.len()).map(|i| SocketRef::new(id, i)).collect(),
            muted_output: false,
        };

        if node.show_preview && !self.context.rendering && !sockets.outputs.is_empty() {
            let preview = self.graph.add_operation(
                Operation::output(
                    format!("{} Preview", node.name),
                    OutputRole::Preview,
                    ResolutionRule::Thumbnail {
                        max_side: self.context.preview_size,
                    },
                )
                .with_origin(&node.name),
            );
            self.graph
                .connect(sockets.outputs[0], SocketRef::new(preview, 0))?;
        }
        Ok(sockets)
    }

    fn add_link(&mut self, link: &Link) {
        let from = self
            .sockets
            .get(&link.from)
            .and_then(|s| s.outputs.get(link.from_socket))
            .copied();
        let to = self.sockets.get(&link.to).and_then(|s| {
            if s.muted_output {
                None
            } else {
                s.inputs.get(link.to_socket).copied()
            }
        });

        let (Some(from), Some(to)) = (from, to) else {
            if self.sockets.get(&link.to).is_some_and(|s| s.muted_output) {
                debug!("Dropping link into muted output '{}'", link.to);
            } else {
                warn!(
                    "Dropping link {}:{} -> {}:{}: unknown node or socket",
                    link.from, link.from_socket, link.to, link.to_socket
                );
            }
            self.dropped_links += 1;
            return;
        };

        if self.reaches(to.operation, from.operation) {
            warn!(
                "Dropping link {}:{} -> {}:{}: would close a cycle",
                link.from, link.from_socket, link.to, link.to_socket
            );
            self.dropped_links += 1;
            return;
        }

        if let Err(e) = self.graph.connect(from, to) {
            warn!(
                "Dropping link {}:{} -> {}:{}: {}",
                link.from, link.from_socket, link.to, link.to_socket, e
            );
            self.dropped_links += 1;
        }
    }

    /// Whether `target` is downstream of (or equal to) `start`.
    fn reaches(&self, start: OperationId, target: OperationId) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            let Ok(op) = self.graph.operation(id) else {
                continue;
            };
            for index in 0..op.outputs.len() {
                stack.extend(
                    self.graph
                        .consumers(SocketRef::new(id, index))
                        .into_iter()
                        .map(|to| to.operation),
                );
            }
        }
        false
    }
}
