use std::sync::Arc;

use serde::Serialize;

use tessera_core::{DataType, Pixel, Priority, Quality, Resolution, ResizeMode, TRANSPARENT};

use crate::buffer::MemoryBuffer;
use crate::ids::{ConnectionId, OperationId, ProxyId, SocketRef};
use crate::sample::InputSampler;

/// Per-run settings handed to operations when they are initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub quality: Quality,
    pub rendering: bool,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            quality: Quality::High,
            rendering: false,
        }
    }
}

/// How an operation derives its resolution during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionRule {
    /// Take the resolution of the given input; the remaining inputs are then
    /// resolved with it as their preferred resolution.
    MainInput(usize),
    /// Independent of inputs (image-like sources).
    Fixed(Resolution),
    /// Adopt whatever the consumer prefers (constants).
    Preferred,
    /// Scene render size; inputs are resolved with it as preferred.
    Render(Resolution),
    /// Input resolution scaled down so its longest side is at most `max_side`.
    Thumbnail { max_side: u32 },
}

/// Declared shape of one input of a [`PixelOperation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub data_type: DataType,
    pub default: Pixel,
    pub resize_mode: ResizeMode,
}

impl InputSpec {
    pub fn new(data_type: DataType, default: Pixel) -> Self {
        Self {
            data_type,
            default,
            resize_mode: ResizeMode::Center,
        }
    }

    pub fn value(default: f32) -> Self {
        Self::new(DataType::Value, [default, 0.0, 0.0, 0.0])
    }

    pub fn color(default: Pixel) -> Self {
        Self::new(DataType::Color, default)
    }

    pub fn with_resize_mode(mut self, mode: ResizeMode) -> Self {
        self.resize_mode = mode;
        self
    }
}

/// Pixel math of a single computation unit.
///
/// The engine never looks inside an implementation beyond this contract:
/// socket shapes, complexity, resolution rule, init/deinit, and evaluation
/// of one output at one coordinate. Complex operations may sample their
/// inputs anywhere; the engine buffers them so that is cheap.
pub trait PixelOperation: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn inputs(&self) -> Vec<InputSpec>;

    fn outputs(&self) -> Vec<DataType> {
        vec![DataType::Color]
    }

    /// Whole-image dependent; gets surrounded by write/read-buffers.
    fn is_complex(&self) -> bool {
        false
    }

    /// Must be computed as one chunk.
    fn is_single_threaded(&self) -> bool {
        false
    }

    /// Would use an accelerator if one were active.
    fn prefers_gpu(&self) -> bool {
        false
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::MainInput(0)
    }

    fn init_execution(&self, _context: &EvaluationContext) {}

    fn evaluate(&self, output: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel;

    fn deinit_execution(&self) {}
}

/// Role of an output operation; decides whether it counts as an output for a
/// given run and which tier it runs in by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum OutputRole {
    Composite,
    Viewer { active: bool },
    Preview,
}

impl OutputRole {
    pub fn is_output(self, rendering: bool) -> bool {
        match self {
            OutputRole::Composite => true,
            OutputRole::Viewer { active } => active,
            OutputRole::Preview => !rendering,
        }
    }

    pub fn default_priority(self) -> Priority {
        match self {
            OutputRole::Composite => Priority::High,
            OutputRole::Viewer { active: true } => Priority::High,
            OutputRole::Viewer { active: false } | OutputRole::Preview => Priority::Low,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub role: OutputRole,
    pub priority: Priority,
    /// Allocated at init; handed to the caller after execution.
    pub buffer: Option<Arc<MemoryBuffer>>,
}

/// The closed set of operation variants the engine schedules.
#[derive(Debug, Clone)]
pub enum OperationKind {
    Compute(Arc<dyn PixelOperation>),
    TypeConversion {
        from: DataType,
        to: DataType,
    },
    ResolutionConversion {
        mode: ResizeMode,
        source: Resolution,
    },
    WriteBuffer {
        proxy: ProxyId,
    },
    ReadBuffer {
        proxy: ProxyId,
        /// Sequential position among read-buffers, assigned before execution.
        offset: Option<usize>,
        buffer: Option<Arc<MemoryBuffer>>,
    },
    Output(OutputTarget),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationFlags {
    pub complex: bool,
    pub single_threaded: bool,
    pub prefers_gpu: bool,
}

#[derive(Debug, Clone)]
pub struct InputSocket {
    pub data_type: DataType,
    pub resize_mode: ResizeMode,
    /// Used when nothing is connected.
    pub default_value: Pixel,
    pub connection: Option<ConnectionId>,
}

impl InputSocket {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            resize_mode: ResizeMode::Center,
            default_value: TRANSPARENT,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

impl From<InputSpec> for InputSocket {
    fn from(spec: InputSpec) -> Self {
        Self {
            data_type: spec.data_type,
            resize_mode: spec.resize_mode,
            default_value: spec.default,
            connection: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputSocket {
    pub data_type: DataType,
    pub connections: Vec<ConnectionId>,
}

impl OutputSocket {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            connections: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: SocketRef,
    pub to: SocketRef,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub id: OperationId,
    pub name: String,
    pub kind: OperationKind,
    pub inputs: Vec<InputSocket>,
    pub outputs: Vec<OutputSocket>,
    pub flags: OperationFlags,
    pub rule: ResolutionRule,
    /// Name of the authored node this operation was translated from.
    pub origin: Option<String>,
    pub(crate) resolution: Option<Resolution>,
}

impl Operation {
    fn base(name: impl Into<String>, kind: OperationKind, rule: ResolutionRule) -> Self {
        Self {
            id: OperationId(usize::MAX),
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            flags: OperationFlags::default(),
            rule,
            origin: None,
            resolution: None,
        }
    }

    pub fn compute(inner: Arc<dyn PixelOperation>) -> Self {
        let mut op = Self::base(
            inner.name().to_string(),
            OperationKind::Compute(Arc::clone(&inner)),
            inner.resolution_rule(),
        );
        op.inputs = inner.inputs().into_iter().map(InputSocket::from).collect();
        op.outputs = inner.outputs().into_iter().map(OutputSocket::new).collect();
        op.flags = OperationFlags {
            complex: inner.is_complex(),
            single_threaded: inner.is_single_threaded(),
            prefers_gpu: inner.prefers_gpu(),
        };
        op
    }

    pub fn type_conversion(from: DataType, to: DataType) -> Self {
        let mut op = Self::base(
            format!("Convert{from}To{to}"),
            OperationKind::TypeConversion { from, to },
            ResolutionRule::MainInput(0),
        );
        op.inputs.push(InputSocket::new(from));
        op.outputs.push(OutputSocket::new(to));
        op
    }

    /// Adapts `source` to `target`; the result already carries `target`.
    pub fn resolution_conversion(
        data_type: DataType,
        mode: ResizeMode,
        source: Resolution,
        target: Resolution,
    ) -> Self {
        let mut op = Self::base(
            format!("{mode:?}Resize"),
            OperationKind::ResolutionConversion { mode, source },
            ResolutionRule::Fixed(target),
        );
        let mut input = InputSocket::new(data_type);
        input.resize_mode = ResizeMode::None;
        op.inputs.push(input);
        op.outputs.push(OutputSocket::new(data_type));
        op.resolution = Some(target);
        op
    }

    pub fn write_buffer(data_type: DataType, proxy: ProxyId) -> Self {
        let mut op = Self::base(
            "WriteBuffer",
            OperationKind::WriteBuffer { proxy },
            ResolutionRule::MainInput(0),
        );
        let mut input = InputSocket::new(data_type);
        input.resize_mode = ResizeMode::None;
        op.inputs.push(input);
        op
    }

    pub fn read_buffer(data_type: DataType, proxy: ProxyId) -> Self {
        let mut op = Self::base(
            "ReadBuffer",
            OperationKind::ReadBuffer {
                proxy,
                offset: None,
                buffer: None,
            },
            ResolutionRule::Preferred,
        );
        op.outputs.push(OutputSocket::new(data_type));
        op
    }

    pub fn output(name: impl Into<String>, role: OutputRole, rule: ResolutionRule) -> Self {
        let mut op = Self::base(
            name,
            OperationKind::Output(OutputTarget {
                role,
                priority: role.default_priority(),
                buffer: None,
            }),
            rule,
        );
        let mut input = InputSocket::new(DataType::Color);
        if matches!(role, OutputRole::Preview) {
            input.resize_mode = ResizeMode::Fit;
        }
        op.inputs.push(input);
        op
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Overrides the role's default tier. No effect on non-outputs.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        if let OperationKind::Output(target) = &mut self.kind {
            target.priority = priority;
        }
        self
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution.unwrap_or(Resolution::ZERO)
    }

    pub fn is_resolution_set(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = Some(resolution);
    }

    pub fn is_output(&self, rendering: bool) -> bool {
        match &self.kind {
            OperationKind::Output(target) => target.role.is_output(rendering),
            _ => false,
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(
            &self.kind,
            OperationKind::Output(OutputTarget {
                role: OutputRole::Preview,
                ..
            })
        )
    }

    pub fn is_complex(&self) -> bool {
        self.flags.complex
    }

    pub fn is_read_buffer(&self) -> bool {
        matches!(self.kind, OperationKind::ReadBuffer { .. })
    }

    pub fn is_write_buffer(&self) -> bool {
        matches!(self.kind, OperationKind::WriteBuffer { .. })
    }

    /// Write-buffers and outputs: operations that store rather than produce pixels.
    pub fn is_sink(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::WriteBuffer { .. } | OperationKind::Output(_)
        )
    }

    /// Memory proxy this operation writes to or reads from.
    pub fn proxy(&self) -> Option<ProxyId> {
        match &self.kind {
            OperationKind::WriteBuffer { proxy } | OperationKind::ReadBuffer { proxy, .. } => {
                Some(*proxy)
            }
            _ => None,
        }
    }

    /// Priority of an output operation; `None` for everything else.
    pub fn priority(&self) -> Option<Priority> {
        match &self.kind {
            OperationKind::Output(target) => Some(target.priority),
            _ => None,
        }
    }

    /// Data type this sink stores; the type of its single input.
    pub fn sink_data_type(&self) -> DataType {
        self.inputs
            .first()
            .map(|s| s.data_type)
            .unwrap_or(DataType::Color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_roles() {
        assert!(OutputRole::Composite.is_output(true));
        assert!(OutputRole::Composite.is_output(false));
        assert!(OutputRole::Viewer { active: true }.is_output(true));
        assert!(!OutputRole::Viewer { active: false }.is_output(false));
        assert!(OutputRole::Preview.is_output(false));
        assert!(!OutputRole::Preview.is_output(true));
    }

    #[test]
    fn default_priorities() {
        assert_eq!(OutputRole::Composite.default_priority(), Priority::High);
        assert_eq!(
            OutputRole::Viewer { active: true }.default_priority(),
            Priority::High
        );
        assert_eq!(OutputRole::Preview.default_priority(), Priority::Low);
    }

    #[test]
    fn resolution_conversion_is_pre_resolved() {
        let op = Operation::resolution_conversion(
            DataType::Color,
            ResizeMode::Stretch,
            Resolution::new(50, 50),
            Resolution::new(100, 100),
        );
        assert!(op.is_resolution_set());
        assert_eq!(op.resolution(), Resolution::new(100, 100));
        assert_eq!(op.inputs[0].resize_mode, ResizeMode::None);
    }

    #[test]
    fn buffer_predicates() {
        let w = Operation::write_buffer(DataType::Value, ProxyId(0));
        let r = Operation::read_buffer(DataType::Value, ProxyId(0));
        assert!(w.is_write_buffer() && w.is_sink() && !w.is_read_buffer());
        assert!(r.is_read_buffer() && !r.is_sink());
        assert_eq!(w.proxy(), r.proxy());
    }
}
