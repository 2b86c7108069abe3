#![allow(dead_code)]

use std::sync::Arc;

use tessera_compute::{
    ExecutionReport, ExecutionSystem, InlineScheduler, StopHandle, ThreadScheduler,
};
use tessera_core::{ExecutionConfig, Pixel, Resolution, SchedulerKind, TRANSPARENT};
use tessera_graph::{InputSampler, InputSpec, Node, NodeKind, NodeTree, PixelOperation, ResolutionRule};

pub fn config() -> ExecutionConfig {
    ExecutionConfig {
        worker_threads: 2,
        scheduler: SchedulerKind::Inline,
        ..Default::default()
    }
}

pub fn checker(name: &str, width: u32, height: u32) -> Node {
    Node::new(
        name,
        NodeKind::Checker {
            width,
            height,
            cell: 8,
        },
    )
}

pub fn build(tree: &NodeTree, rendering: bool, fast: bool) -> ExecutionSystem {
    ExecutionSystem::new(tree, &config(), rendering, fast).expect("build execution system")
}

pub fn run_inline(tree: &NodeTree, rendering: bool, fast: bool) -> (ExecutionSystem, ExecutionReport) {
    let mut system = build(tree, rendering, fast);
    let mut scheduler = InlineScheduler::new();
    let report = system.execute(&mut scheduler).expect("execute");
    (system, report)
}

pub fn run_threads(tree: &NodeTree, workers: usize) -> (ExecutionSystem, ExecutionReport) {
    let mut system = build(tree, false, false);
    let mut scheduler = ThreadScheduler::new(workers);
    let report = system.execute(&mut scheduler).expect("execute");
    (system, report)
}

/// Solid source of a fixed size.
#[derive(Debug)]
pub struct Solid {
    pub resolution: Resolution,
    pub color: Pixel,
}

impl PixelOperation for Solid {
    fn name(&self) -> &str {
        "Solid"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::Fixed(self.resolution)
    }

    fn evaluate(&self, _: usize, x: f32, y: f32, _: &InputSampler<'_>) -> Pixel {
        if self.resolution.contains_point(x, y) {
            self.color
        } else {
            TRANSPARENT
        }
    }
}

pub fn solid(name: &str, width: u32, height: u32, color: Pixel) -> Node {
    Node::new(
        name,
        NodeKind::Custom(Arc::new(Solid {
            resolution: Resolution::new(width, height),
            color,
        })),
    )
}

/// Source that requests a stop the first time it is evaluated.
#[derive(Debug)]
pub struct Tripwire {
    pub resolution: Resolution,
    pub handle: StopHandle,
}

impl PixelOperation for Tripwire {
    fn name(&self) -> &str {
        "Tripwire"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        Vec::new()
    }

    fn resolution_rule(&self) -> ResolutionRule {
        ResolutionRule::Fixed(self.resolution)
    }

    fn evaluate(&self, _: usize, _: f32, _: f32, _: &InputSampler<'_>) -> Pixel {
        self.handle.stop();
        [1.0, 1.0, 1.0, 1.0]
    }
}
