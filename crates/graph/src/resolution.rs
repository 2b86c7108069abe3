use tessera_core::{Resolution, ResizeMode};

use crate::error::GraphError;
use crate::ids::{OperationId, SocketRef};
use crate::operation::ResolutionRule;
use crate::store::OperationGraph;

impl OperationGraph {
    /// Resolve the resolution of `id` and, recursively, of everything feeding
    /// it. Results are memoized on the operations; an operation that already
    /// carries a resolution is returned as-is.
    pub fn determine_resolution(
        &mut self,
        id: OperationId,
        preferred: Resolution,
    ) -> Result<Resolution, GraphError> {
        let op = self.operation(id)?;
        if let Some(resolution) = op.resolution {
            return Ok(resolution);
        }

        let rule = op.rule;
        let resolution = match rule {
            ResolutionRule::Fixed(fixed) | ResolutionRule::Render(fixed) => {
                self.resolve_inputs(id, fixed)?;
                fixed
            }
            ResolutionRule::Preferred => {
                self.resolve_inputs(id, preferred)?;
                preferred
            }
            ResolutionRule::Thumbnail { max_side } => {
                let input = self.resolve_main_input(id, 0, preferred)?;
                thumbnail(input, max_side)
            }
            ResolutionRule::MainInput(main) => {
                let resolution = self.resolve_main_input(id, main, preferred)?;
                self.resolve_inputs(id, resolution)?;
                resolution
            }
        };

        self.operation_mut(id)?.set_resolution(resolution);
        Ok(resolution)
    }

    /// The main input if connected, else the first connected input with a
    /// usable resolution, else `preferred`.
    fn resolve_main_input(
        &mut self,
        id: OperationId,
        main: usize,
        preferred: Resolution,
    ) -> Result<Resolution, GraphError> {
        if let Some(source) = self.input_source(SocketRef::new(id, main)) {
            return self.determine_resolution(source.operation, preferred);
        }
        let input_count = self.operation(id)?.inputs.len();
        for index in 0..input_count {
            if let Some(source) = self.input_source(SocketRef::new(id, index)) {
                let resolution = self.determine_resolution(source.operation, preferred)?;
                if !resolution.is_degenerate() {
                    return Ok(resolution);
                }
            }
        }
        Ok(preferred)
    }

    fn resolve_inputs(&mut self, id: OperationId, preferred: Resolution) -> Result<(), GraphError> {
        let input_count = self.operation(id)?.inputs.len();
        for index in 0..input_count {
            if let Some(source) = self.input_source(SocketRef::new(id, index)) {
                self.determine_resolution(source.operation, preferred)?;
            }
        }
        Ok(())
    }

    /// Whether the edge into `to` needs a resolution conversion: the input
    /// allows resizing and the two ends disagree.
    pub fn needs_resolution_conversion(&self, to: SocketRef) -> bool {
        let Ok(consumer) = self.operation(to.operation) else {
            return false;
        };
        let Some(socket) = consumer.inputs.get(to.index) else {
            return false;
        };
        if socket.resize_mode == ResizeMode::None || !socket.is_connected() {
            return false;
        }
        self.input_resolution(to) != consumer.resolution()
    }
}

/// Scale `input` so its longest side equals `max_side`, keeping the aspect
/// ratio. Degenerate inputs stay degenerate.
pub fn thumbnail(input: Resolution, max_side: u32) -> Resolution {
    if input.is_degenerate() || max_side == 0 {
        return Resolution::ZERO;
    }
    let longest = input.width.max(input.height) as f64;
    let scale = max_side as f64 / longest;
    Resolution::new(
        ((input.width as f64 * scale).round() as u32).max(1),
        ((input.height as f64 * scale).round() as u32).max(1),
    )
}
