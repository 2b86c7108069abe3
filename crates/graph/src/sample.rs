use tessera_core::{DataType, Pixel, Resolution, ResizeMode, TRANSPARENT};

use crate::ids::SocketRef;
use crate::operation::{Operation, OperationKind};
use crate::store::OperationGraph;

/// View of one operation's inputs handed to [`crate::PixelOperation::evaluate`].
pub struct InputSampler<'a> {
    graph: &'a OperationGraph,
    operation: &'a Operation,
}

impl<'a> InputSampler<'a> {
    pub fn new(graph: &'a OperationGraph, operation: &'a Operation) -> Self {
        Self { graph, operation }
    }

    /// Pixel of input `index` at (x, y); the socket default when unconnected.
    pub fn sample(&self, index: usize, x: f32, y: f32) -> Pixel {
        self.graph
            .sample_input(SocketRef::new(self.operation.id, index), x, y)
    }

    /// Resolution of the producer feeding input `index`.
    pub fn input_resolution(&self, index: usize) -> Resolution {
        self.graph
            .input_resolution(SocketRef::new(self.operation.id, index))
    }

    pub fn resolution(&self) -> Resolution {
        self.operation.resolution()
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.operation
            .inputs
            .get(index)
            .is_some_and(|s| s.is_connected())
    }
}

impl OperationGraph {
    /// Evaluate an output socket at one coordinate, pulling from upstream.
    pub fn sample_output(&self, from: SocketRef, x: f32, y: f32) -> Pixel {
        let Ok(op) = self.operation(from.operation) else {
            return TRANSPARENT;
        };
        match &op.kind {
            OperationKind::Compute(inner) => {
                inner.evaluate(from.index, x, y, &InputSampler::new(self, op))
            }
            OperationKind::TypeConversion { from: source, to } => convert_pixel(
                self.sample_input(SocketRef::new(op.id, 0), x, y),
                *source,
                *to,
            ),
            OperationKind::ResolutionConversion { mode, source } => {
                let (sx, sy) =
                    map_coordinates(*mode, *source, op.resolution(), x, y).unwrap_or((x, y));
                self.sample_input(SocketRef::new(op.id, 0), sx, sy)
            }
            OperationKind::ReadBuffer { buffer, .. } => buffer
                .as_ref()
                .map(|b| b.read(x, y))
                .unwrap_or(TRANSPARENT),
            OperationKind::WriteBuffer { .. } | OperationKind::Output(_) => {
                self.sample_input(SocketRef::new(op.id, 0), x, y)
            }
        }
    }

    /// Value arriving at an input socket.
    pub fn sample_input(&self, to: SocketRef, x: f32, y: f32) -> Pixel {
        match self.input_source(to) {
            Some(from) => self.sample_output(from, x, y),
            None => self
                .operation(to.operation)
                .ok()
                .and_then(|op| op.inputs.get(to.index))
                .map(|s| s.default_value)
                .unwrap_or(TRANSPARENT),
        }
    }
}

/// Convert a pixel between data types.
///
/// Scalars broadcast into every color or vector component; colors and
/// vectors collapse to a scalar by averaging their first three channels.
pub fn convert_pixel(pixel: Pixel, from: DataType, to: DataType) -> Pixel {
    let [a, b, c, _] = pixel;
    match (from, to) {
        _ if from == to => pixel,
        (DataType::Value, DataType::Color) => [a, a, a, 1.0],
        (DataType::Value, DataType::Vector) => [a, a, a, 0.0],
        (DataType::Color | DataType::Vector, DataType::Value) => [(a + b + c) / 3.0, 0.0, 0.0, 0.0],
        (DataType::Color, DataType::Vector) => [a, b, c, 0.0],
        (DataType::Vector, DataType::Color) => [a, b, c, 1.0],
        _ => pixel,
    }
}

/// Map a target coordinate back into the source image of a resolution
/// conversion. Coordinates are not clipped; the producer decides what lies
/// outside its frame. `None` only when either side is degenerate.
pub fn map_coordinates(
    mode: ResizeMode,
    source: Resolution,
    target: Resolution,
    x: f32,
    y: f32,
) -> Option<(f32, f32)> {
    if source.is_degenerate() || target.is_degenerate() {
        return None;
    }
    let (sw, sh) = (source.width as f32, source.height as f32);
    let (tw, th) = (target.width as f32, target.height as f32);

    let (sx, sy) = match mode {
        ResizeMode::None | ResizeMode::Center => (x - (tw - sw) / 2.0, y - (th - sh) / 2.0),
        ResizeMode::Stretch => (x * sw / tw, y * sh / th),
        ResizeMode::Fit => {
            let scale = (tw / sw).min(th / sh);
            let offset_x = (tw - sw * scale) / 2.0;
            let offset_y = (th - sh * scale) / 2.0;
            ((x - offset_x) / scale, (y - offset_y) / scale)
        }
    };

    Some((sx, sy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_broadcasts_to_color() {
        let p = convert_pixel([0.25, 0.0, 0.0, 0.0], DataType::Value, DataType::Color);
        assert_eq!(p, [0.25, 0.25, 0.25, 1.0]);
    }

    #[test]
    fn color_averages_to_value() {
        let p = convert_pixel([0.3, 0.6, 0.9, 0.5], DataType::Color, DataType::Value);
        assert!((p[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn same_type_is_identity() {
        let p = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(convert_pixel(p, DataType::Vector, DataType::Vector), p);
    }

    #[test]
    fn center_mapping_is_not_clipped() {
        let src = Resolution::new(50, 50);
        let dst = Resolution::new(100, 100);
        assert_eq!(map_coordinates(ResizeMode::Center, src, dst, 50.0, 50.0), Some((25.0, 25.0)));
        assert_eq!(map_coordinates(ResizeMode::Center, src, dst, 10.0, 50.0), Some((-15.0, 25.0)));
        assert_eq!(map_coordinates(ResizeMode::Center, Resolution::ZERO, dst, 1.0, 1.0), None);
    }

    #[test]
    fn stretch_mapping_scales_each_axis() {
        let src = Resolution::new(50, 25);
        let dst = Resolution::new(100, 100);
        assert_eq!(
            map_coordinates(ResizeMode::Stretch, src, dst, 99.0, 99.0),
            Some((49.5, 24.75))
        );
    }

    #[test]
    fn fit_mapping_keeps_aspect() {
        let src = Resolution::new(200, 100);
        let dst = Resolution::new(100, 100);
        // scale 0.5, image occupies rows 25..75
        assert_eq!(
            map_coordinates(ResizeMode::Fit, src, dst, 0.0, 10.0),
            Some((0.0, -30.0))
        );
        assert_eq!(
            map_coordinates(ResizeMode::Fit, src, dst, 50.0, 50.0),
            Some((100.0, 50.0))
        );
    }
}
