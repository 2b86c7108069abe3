use tessera_core::{Pixel, TRANSPARENT};
use tessera_graph::{BlendMode, InputSampler, InputSpec, PixelOperation, ResolutionRule};

const WHITE: Pixel = [1.0, 1.0, 1.0, 1.0];

/// Blends input 2 over input 1 by the factor on input 0. The first image
/// input drives the resolution.
#[derive(Debug)]
pub struct MixOp {
    pub blend: BlendMode,
    pub factor: f32,
}

impl MixOp {
    fn blend_channel(&self, a: f32, b: f32, f: f32) -> f32 {
        match self.blend {
            BlendMode::Mix => a + (b - a) * f,
            BlendMode::Add => a + b * f,
            BlendMode::Multiply => a * (1.0 - f + f * b),
            BlendMode::Subtract => a - b * f,
        }
    }
}

impl PixelOperation for MixOp {
    fn name(&self) -> &str {
        match self.blend {
            BlendMode::Mix => "Mix",
            BlendMode::Add => "MixAdd",
            BlendMode::Multiply => "MixMultiply",
            BlendMode::Subtract => "MixSubtract",
        }
    }

    fn inputs(&self) -> Vec<InputSpec> {
        vec![
            InputSpec::value(self.factor),
            InputSpec::color(WHITE),
            InputSpec::color(WHITE),
        ]
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::MainInput(1)
    }

    fn evaluate(&self, _output: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel {
        let f = inputs.sample(0, x, y)[0].clamp(0.0, 1.0);
        let a = inputs.sample(1, x, y);
        let b = inputs.sample(2, x, y);
        [
            self.blend_channel(a[0], b[0], f),
            self.blend_channel(a[1], b[1], f),
            self.blend_channel(a[2], b[2], f),
            a[3],
        ]
    }
}

#[derive(Debug)]
pub struct InvertOp;

impl PixelOperation for InvertOp {
    fn name(&self) -> &str {
        "Invert"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::value(1.0), InputSpec::color(TRANSPARENT)]
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::MainInput(1)
    }

    fn evaluate(&self, _output: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel {
        let f = inputs.sample(0, x, y)[0];
        let c = inputs.sample(1, x, y);
        let inv = |v: f32| v + ((1.0 - v) - v) * f;
        [inv(c[0]), inv(c[1]), inv(c[2]), c[3]]
    }
}

#[derive(Debug)]
pub struct BrightnessOp {
    pub offset: f32,
}

impl PixelOperation for BrightnessOp {
    fn name(&self) -> &str {
        "Brightness"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::color(TRANSPARENT)]
    }

    fn evaluate(&self, _output: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel {
        let c = inputs.sample(0, x, y);
        [c[0] + self.offset, c[1] + self.offset, c[2] + self.offset, c[3]]
    }
}
