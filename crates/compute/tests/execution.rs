mod common;

use std::sync::Arc;

use tessera_compute::{ExecutionError, GroupState, InlineScheduler, WorkScheduler};
use tessera_core::{Pixel, Priority, Resolution, TRANSPARENT};
use tessera_graph::{
    BlendMode, InputSampler, InputSpec, Node, NodeKind, NodeTree, OutputRole, PixelOperation,
};

use common::{build, checker, run_inline, run_threads, solid, Tripwire};

fn tiered_tree() -> NodeTree {
    NodeTree::new()
        .with_render_size(32, 32)
        .with_chunk_size(16)
        .with_node(checker("bg", 32, 32).with_preview())
        .with_node(Node::new("out", NodeKind::Composite))
        .with_node(
            Node::new("view", NodeKind::Viewer { active: true }).with_priority(Priority::Medium),
        )
        .link("bg", 0, "out", 0)
        .link("bg", 0, "view", 0)
}

#[test]
fn higher_tiers_drain_before_lower_tiers_start() {
    let (system, report) = run_inline(&tiered_tree(), false, false);
    assert_eq!(report.outputs.len(), 3);

    let metrics = &report.metrics;
    let outputs: Vec<_> = system.groups().iter().filter(|g| g.is_output()).collect();
    for a in &outputs {
        for b in &outputs {
            if a.priority < b.priority {
                assert!(
                    metrics.finished_at(a.id).unwrap() < metrics.started_at(b.id).unwrap(),
                    "{} ({}) should finish before {} ({}) starts",
                    a.id,
                    a.priority,
                    b.id,
                    b.priority
                );
            }
        }
    }
    assert_eq!(metrics.groups_executed[&Priority::High], 1);
    assert_eq!(metrics.groups_executed[&Priority::Medium], 1);
    assert_eq!(metrics.groups_executed[&Priority::Low], 1);

    let preview = report.output("bg Preview").unwrap();
    assert_eq!(preview.role, OutputRole::Preview);
    assert_eq!(preview.priority, Priority::Low);
}

#[test]
fn fast_calculation_runs_only_high_priority() {
    let (system, report) = run_inline(&tiered_tree(), false, true);
    let names: Vec<_> = report.outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["out"]);

    for group in system.groups() {
        assert_eq!(group.state(), GroupState::Deinitialized);
        assert_eq!(group.is_completed(), group.priority == Priority::High);
    }
    assert!(!report.metrics.groups_executed.contains_key(&Priority::Medium));
}

#[test]
fn building_twice_gives_the_same_system() {
    let tree = tiered_tree()
        .with_node(Node::new("blur", NodeKind::Blur { radius: 1 }))
        .link("bg", 0, "blur", 0);
    let first = build(&tree, false, false).summary();
    let second = build(&tree, false, false).summary();
    assert_eq!(first, second);
    assert_eq!(first.chunk_size, 16);
}

#[test]
fn invert_of_checker() {
    let tree = NodeTree::new()
        .with_render_size(16, 16)
        .with_node(checker("bg", 16, 16))
        .with_node(Node::new("inv", NodeKind::Invert))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "inv", 1)
        .link("inv", 0, "out", 0);

    let (_, report) = run_inline(&tree, false, false);
    let out = &report.output("out").unwrap().buffer;
    assert_eq!(out.resolution(), Resolution::new(16, 16));
    assert_eq!(out.pixel(0, 0), Some([0.0, 0.0, 0.0, 1.0]));
    assert_eq!(out.pixel(8, 0), Some([1.0, 1.0, 1.0, 1.0]));
    assert_eq!(out.pixel(8, 8), Some([0.0, 0.0, 0.0, 1.0]));
}

#[test]
fn muted_node_passes_its_input_through() {
    let tree = NodeTree::new()
        .with_render_size(16, 16)
        .with_node(checker("bg", 16, 16))
        .with_node(Node::new("inv", NodeKind::Invert).muted())
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "inv", 1)
        .link("inv", 0, "out", 0);

    let (_, report) = run_inline(&tree, false, false);
    let out = &report.output("out").unwrap().buffer;
    assert_eq!(out.pixel(0, 0), Some([1.0, 1.0, 1.0, 1.0]));
    assert_eq!(out.pixel(8, 0), Some([0.0, 0.0, 0.0, 1.0]));
}

#[test]
fn blur_of_constant_stays_constant_on_threads() {
    let color = [0.2, 0.4, 0.6, 1.0];
    let tree = NodeTree::new()
        .with_render_size(48, 48)
        .with_chunk_size(16)
        .with_node(solid("fill", 48, 48, color))
        .with_node(Node::new("blur", NodeKind::Blur { radius: 2 }))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("fill", 0, "blur", 0)
        .link("blur", 0, "out", 0);

    let (system, report) = run_threads(&tree, 4);
    assert_eq!(system.summary().buffer_groups, 2);

    let out = &report.output("out").unwrap().buffer;
    for (x, y) in [(0, 0), (24, 24), (47, 47), (0, 47)] {
        let p = out.pixel(x, y).unwrap();
        for (got, want) in p.iter().zip(color) {
            assert!((got - want).abs() < 1e-5, "({x}, {y}): {p:?}");
        }
    }
    assert_eq!(report.metrics.chunks_executed, 27);
    assert_eq!(report.metrics.chunks_abandoned, 0);
}

#[test]
fn threads_and_inline_agree() {
    let tree = NodeTree::new()
        .with_render_size(40, 24)
        .with_chunk_size(16)
        .with_node(checker("bg", 40, 24))
        .with_node(Node::new("grad", NodeKind::Gradient { width: 40, height: 24 }))
        .with_node(Node::new("mix", NodeKind::Mix {
            blend: BlendMode::Multiply,
            factor: 0.75,
        }))
        .with_node(Node::new("blur", NodeKind::Blur { radius: 1 }))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "mix", 1)
        .link("grad", 0, "mix", 2)
        .link("mix", 0, "blur", 0)
        .link("blur", 0, "out", 0);

    let (_, inline) = run_inline(&tree, false, false);
    let (_, threaded) = run_threads(&tree, 3);
    assert_eq!(
        inline.output("out").unwrap().buffer.snapshot(),
        threaded.output("out").unwrap().buffer.snapshot()
    );
}

#[test]
fn degenerate_group_is_skipped() {
    // a viewer fed only by a constant has nothing to size it
    let tree = NodeTree::new()
        .with_render_size(16, 16)
        .with_node(checker("bg", 16, 16))
        .with_node(Node::new("v", NodeKind::Value { value: 0.5 }))
        .with_node(Node::new("out", NodeKind::Composite))
        .with_node(Node::new("view", NodeKind::Viewer { active: true }))
        .link("bg", 0, "out", 0)
        .link("v", 0, "view", 0);

    let (system, report) = run_inline(&tree, false, false);
    assert_eq!(report.metrics.groups_skipped, 1);
    assert!(report.output("view").is_none());
    assert!(report.output("out").is_some());
    assert!(system
        .groups()
        .iter()
        .all(|g| g.state() == GroupState::Deinitialized));
}

#[test]
fn stop_abandons_queued_chunks() {
    let mut scheduler = InlineScheduler::new();
    let trip = Tripwire {
        resolution: Resolution::new(64, 64),
        handle: scheduler.stop_handle(),
    };
    let tree = NodeTree::new()
        .with_render_size(64, 64)
        .with_chunk_size(16)
        .with_node(Node::new("trip", NodeKind::Custom(Arc::new(trip))))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("trip", 0, "out", 0);

    let mut system = build(&tree, false, false);
    let report = system.execute(&mut scheduler).unwrap();
    assert_eq!(report.metrics.chunks_executed, 1);
    assert_eq!(report.metrics.chunks_abandoned, 15);
    assert!(report.outputs.is_empty());
    assert!(report.metrics.groups_executed.is_empty());
}

#[test]
fn second_execute_is_rejected() {
    let tree = NodeTree::new()
        .with_render_size(16, 16)
        .with_node(checker("bg", 16, 16))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "out", 0);

    let mut system = build(&tree, false, false);
    let mut scheduler = InlineScheduler::new();
    system.execute(&mut scheduler).unwrap();
    let err = system.execute(&mut scheduler).unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::InvalidTransition {
            from: GroupState::Deinitialized,
            to: GroupState::Initialized,
            ..
        }
    ));
}

#[test]
fn tree_from_toml_runs_end_to_end() {
    let tree = NodeTree::from_toml(
        r#"
chunk_size = 32
render_size = { width = 64, height = 32 }

[[nodes]]
name = "bg"
kind = { type = "checker", width = 64, height = 32 }

[[nodes]]
name = "bright"
kind = { type = "brightness", offset = -0.5 }

[[nodes]]
name = "out"
kind = { type = "composite" }

[[links]]
from = "bg"
to = "bright"

[[links]]
from = "bright"
to = "out"
"#,
    )
    .unwrap();

    let (system, report) = run_inline(&tree, true, false);
    assert_eq!(system.summary().chunk_size, 32);
    assert_eq!(system.summary().groups, 1);
    let out = report.output("out").unwrap();
    assert_eq!(out.resolution, Resolution::new(64, 32));
    assert_eq!(out.buffer.pixel(0, 0), Some([0.5, 0.5, 0.5, 1.0]));
    assert_eq!(out.buffer.pixel(8, 0), Some([-0.5, -0.5, -0.5, 1.0]));
    assert_eq!(report.metrics.chunks_executed, 2);
}

/// Halves its input; asks for an accelerator it will never get.
#[derive(Debug)]
struct Halve;

impl PixelOperation for Halve {
    fn name(&self) -> &str {
        "Halve"
    }

    fn inputs(&self) -> Vec<InputSpec> {
        vec![InputSpec::color(TRANSPARENT)]
    }

    fn prefers_gpu(&self) -> bool {
        true
    }

    fn evaluate(&self, _: usize, x: f32, y: f32, inputs: &InputSampler<'_>) -> Pixel {
        let c = inputs.sample(0, x, y);
        [c[0] * 0.5, c[1] * 0.5, c[2] * 0.5, c[3]]
    }
}

#[test]
fn accelerator_preference_runs_on_cpu_without_devices() {
    let tree = NodeTree::new()
        .with_render_size(16, 16)
        .with_node(checker("bg", 16, 16))
        .with_node(Node::new("halve", NodeKind::Custom(Arc::new(Halve))))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "halve", 0)
        .link("halve", 0, "out", 0);

    let (system, report) = run_threads(&tree, 2);
    assert!(!system.context().has_active_gpu);
    assert!(system.groups()[0].prefers_gpu);
    assert!(system.groups()[0].is_completed());

    let out = &report.output("out").unwrap().buffer;
    assert_eq!(out.pixel(0, 0), Some([0.5, 0.5, 0.5, 1.0]));
    assert_eq!(out.pixel(8, 0), Some([0.0, 0.0, 0.0, 1.0]));
}
