use std::sync::atomic::{AtomicU32, Ordering};

use tessera_core::{Pixel, TRANSPARENT};
use tessera_graph::{EvaluationContext, InputSampler, InputSpec, PixelOperation};

/// Box blur. Complex: every output pixel reads a neighbourhood of its input,
/// so the engine feeds it from a read-buffer.
#[derive(Debug)]
pub struct BlurOp {
    radius: u32,
    /// Sampling stride, set from the quality tier at init.
    step: AtomicU32,
}

impl BlurOp {
    pub fn new(radius: u32) -> Self {
        Self {
            radius,
            step: AtomicU32::new(1),
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }
}

impl PixelOperation for BlurOp {
    fn name(&self) -> &str {
        "Blur"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::color(TRANSPARENT)]
    }

    fn is_complex(&self) -> bool {
        true
    }

    fn init_execution(&self, context: &EvaluationContext) {
        self.step
            .store(context.quality.sample_step(), Ordering::Relaxed);
    }

    fn evaluate(&self, _output: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel {
        let source = inputs.input_resolution(0);
        let r = self.radius as i64;
        let step = self.step.load(Ordering::Relaxed).max(1) as usize;
        let (cx, cy) = (x.floor() as i64, y.floor() as i64);

        let mut sum = [0.0f32; 4];
        let mut count = 0u32;
        for dy in (-r..=r).step_by(step) {
            for dx in (-r..=r).step_by(step) {
                let (sx, sy) = (cx + dx, cy + dy);
                if !source.contains(sx, sy) {
                    continue;
                }
                let p = inputs.sample(0, sx as f32, sy as f32);
                for (acc, v) in sum.iter_mut().zip(p) {
                    *acc += v;
                }
                count += 1;
            }
        }
        if count == 0 {
            return TRANSPARENT;
        }
        sum.map(|v| v / count as f32)
    }

    fn deinit_execution(&self) {
        self.step.store(1, Ordering::Relaxed);
    }
}
