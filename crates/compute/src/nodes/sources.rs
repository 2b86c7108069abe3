use tessera_core::{DataType, Pixel, Resolution, TRANSPARENT};
use tessera_graph::{InputSampler, InputSpec, PixelOperation, ResolutionRule};

/// Constant scalar; takes whatever resolution its consumer prefers.
#[derive(Debug)]
pub struct ValueOp {
    pub value: f32,
}

impl PixelOperation for ValueOp {
    fn name(&self) -> &str {
        "Value"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<DataType> {
        vec![DataType::Value]
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::Preferred
    }

    fn evaluate(&self, _output: usize, _x: f32, _y: f32, _inputs: &InputSampler<'_>) -> Pixel {
        [self.value, 0.0, 0.0, 0.0]
    }
}

#[derive(Debug)]
pub struct RgbOp {
    pub color: Pixel,
}

impl PixelOperation for RgbOp {
    fn name(&self) -> &str {
        "RGB"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::Preferred
    }

    fn evaluate(&self, _output: usize, _x: f32, _y: f32, _inputs: &InputSampler<'_>) -> Pixel {
        self.color
    }
}

/// Black and white checkerboard of `cell`-sized squares.
#[derive(Debug)]
pub struct CheckerOp {
    pub resolution: Resolution,
    pub cell: u32,
}

impl PixelOperation for CheckerOp {
    fn name(&self) -> &str {
        "Checker"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::Fixed(self.resolution)
    }

    fn evaluate(&self, _output: usize, x: f32, y: f32, _inputs: &InputSampler<'_>) -> Pixel {
        if !self.resolution.contains_point(x, y) {
            return TRANSPARENT;
        }
        let cell = self.cell.max(1) as f32;
        let parity = ((x / cell).floor() + (y / cell).floor()) as i64 % 2;
        if parity == 0 {
            [1.0, 1.0, 1.0, 1.0]
        } else {
            [0.0, 0.0, 0.0, 1.0]
        }
    }
}

/// Horizontal black-to-white ramp.
#[derive(Debug)]
pub struct GradientOp {
    pub resolution: Resolution,
}

impl PixelOperation for GradientOp {
    fn name(&self) -> &str {
        "Gradient"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::Fixed(self.resolution)
    }

    fn evaluate(&self, _output: usize, x: f32, y: f32, _inputs: &InputSampler<'_>) -> Pixel {
        if !self.resolution.contains_point(x, y) {
            return TRANSPARENT;
        }
        let span = self.resolution.width.saturating_sub(1).max(1) as f32;
        let v = (x / span).clamp(0.0, 1.0);
        [v, v, v, 1.0]
    }
}
