mod common;

use tessera_core::{DataType, Resolution, ResizeMode};
use tessera_graph::{Node, NodeKind, NodeTree, OperationKind, SocketRef};

use common::{build, checker, run_inline, solid};

#[test]
fn mismatched_inputs_get_exactly_one_conversion() {
    let tree = NodeTree::new()
        .with_render_size(100, 100)
        .with_node(checker("big", 100, 100))
        .with_node(checker("small", 50, 50))
        .with_node(Node::new("mix", NodeKind::Mix {
            blend: Default::default(),
            factor: 0.5,
        }))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("big", 0, "mix", 1)
        .link("small", 0, "mix", 2)
        .link("mix", 0, "out", 0);

    let system = build(&tree, false, false);
    assert_eq!(system.summary().resolution_conversions, 1);

    let graph = system.graph();
    let conversion = graph
        .operations()
        .iter()
        .find(|op| matches!(op.kind, OperationKind::ResolutionConversion { .. }))
        .unwrap();
    assert_eq!(conversion.resolution(), Resolution::new(100, 100));
    assert!(matches!(
        conversion.kind,
        OperationKind::ResolutionConversion {
            mode: ResizeMode::Center,
            source
        } if source == Resolution::new(50, 50)
    ));

    // it sits on the edge from the small source into the mix
    let fed = graph.consumers(SocketRef::new(conversion.id, 0));
    assert_eq!(fed.len(), 1);
    assert_eq!(fed[0].index, 2);
    let from = graph.input_source(SocketRef::new(conversion.id, 0)).unwrap();
    assert_eq!(graph.operation(from.operation).unwrap().origin.as_deref(), Some("small"));
}

#[test]
fn every_connection_agrees_after_conversion() {
    let tree = NodeTree::new()
        .with_render_size(64, 48)
        .with_node(Node::new("v", NodeKind::Value { value: 0.25 }))
        .with_node(checker("bg", 32, 32))
        .with_node(Node::new("mix", NodeKind::Mix {
            blend: Default::default(),
            factor: 0.5,
        }))
        .with_node(Node::new("blur", NodeKind::Blur { radius: 1 }))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "mix", 1)
        .link("v", 0, "mix", 2)
        .link("mix", 0, "blur", 0)
        .link("blur", 0, "out", 0);

    let system = build(&tree, false, false);
    let graph = system.graph();
    for connection in graph.connections() {
        let from = graph.operation(connection.from.operation).unwrap();
        let to = graph.operation(connection.to.operation).unwrap();
        assert_eq!(
            from.outputs[connection.from.index].data_type,
            to.inputs[connection.to.index].data_type
        );
        let resizes = to.inputs[connection.to.index].resize_mode != ResizeMode::None;
        if resizes && from.is_resolution_set() && to.is_resolution_set() {
            assert_eq!(from.resolution(), to.resolution());
        }
    }
    // value -> color on the mix input; blur output resized 32x32 -> 64x48
    assert_eq!(system.summary().type_conversions, 1);
    assert_eq!(system.summary().resolution_conversions, 1);
}

#[test]
fn value_into_composite_is_broadcast() {
    let tree = NodeTree::new()
        .with_render_size(8, 8)
        .with_node(Node::new("v", NodeKind::Value { value: 0.25 }))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("v", 0, "out", 0);

    let (system, report) = run_inline(&tree, false, false);
    assert_eq!(system.summary().type_conversions, 1);
    let out = report.output("out").unwrap();
    assert_eq!(out.resolution, Resolution::new(8, 8));
    assert_eq!(out.buffer.data_type(), DataType::Color);
    assert_eq!(out.buffer.pixel(7, 7), Some([0.25, 0.25, 0.25, 1.0]));
}

#[test]
fn smaller_source_is_centered() {
    let tree = NodeTree::new()
        .with_render_size(4, 4)
        .with_node(solid("dot", 2, 2, [1.0, 0.0, 0.0, 1.0]))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("dot", 0, "out", 0);

    let (_, report) = run_inline(&tree, false, false);
    let out = &report.output("out").unwrap().buffer;
    assert_eq!(out.pixel(0, 0), Some([0.0; 4]));
    assert_eq!(out.pixel(1, 1), Some([1.0, 0.0, 0.0, 1.0]));
    assert_eq!(out.pixel(2, 2), Some([1.0, 0.0, 0.0, 1.0]));
    assert_eq!(out.pixel(3, 3), Some([0.0; 4]));
}

#[test]
fn buffer_groups_are_written_before_they_are_read() {
    let tree = NodeTree::new()
        .with_render_size(40, 40)
        .with_chunk_size(16)
        .with_node(checker("bg", 40, 40))
        .with_node(Node::new("blur1", NodeKind::Blur { radius: 1 }))
        .with_node(Node::new("blur2", NodeKind::Blur { radius: 1 }))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "blur1", 0)
        .link("blur1", 0, "blur2", 0)
        .link("blur2", 0, "out", 0);

    let (system, report) = run_inline(&tree, false, false);
    let metrics = &report.metrics;
    let mut checked = 0;
    for group in system.groups() {
        let started = metrics.started_at(group.id).unwrap();
        for dependency in &group.dependencies {
            let finished = metrics.finished_at(*dependency).unwrap();
            assert!(finished < started, "{dependency} finished after {} started", group.id);
            checked += 1;
        }
    }
    assert_eq!(checked, 3);
    assert_eq!(system.groups().len(), 4);
}

#[test]
fn preview_is_a_fitted_thumbnail() {
    let tree = NodeTree::new()
        .with_render_size(280, 140)
        .with_node(checker("bg", 280, 140).with_preview())
        .with_node(Node::new("out", NodeKind::Composite))
        .link("bg", 0, "out", 0);

    let (system, report) = run_inline(&tree, false, false);
    let preview = report.output("bg Preview").unwrap();
    assert_eq!(preview.resolution, Resolution::new(140, 70));
    assert_eq!(preview.buffer.mean()[3], 1.0);
    assert_eq!(system.summary().resolution_conversions, 1);

    let (rendered, report) = run_inline(&tree, true, false);
    assert!(report.output("bg Preview").is_none());
    assert_eq!(rendered.summary().outputs, 1);
}

#[test]
fn shared_constant_fills_every_consumer_frame() {
    let red = [1.0, 0.0, 0.0, 1.0];
    let green = [0.0, 1.0, 0.0, 1.0];
    let mix = || NodeKind::Mix {
        blend: Default::default(),
        factor: 0.5,
    };
    // the viewer is resolved first, so the shared value settles at 50x50
    let tree = NodeTree::new()
        .with_render_size(100, 100)
        .with_node(Node::new("fac", NodeKind::Value { value: 1.0 }))
        .with_node(solid("red_small", 50, 50, red))
        .with_node(solid("green_small", 50, 50, green))
        .with_node(Node::new("mix_small", mix()))
        .with_node(Node::new("view", NodeKind::Viewer { active: true }))
        .with_node(solid("red_big", 100, 100, red))
        .with_node(solid("green_big", 100, 100, green))
        .with_node(Node::new("mix_big", mix()))
        .with_node(Node::new("out", NodeKind::Composite))
        .link("fac", 0, "mix_small", 0)
        .link("red_small", 0, "mix_small", 1)
        .link("green_small", 0, "mix_small", 2)
        .link("mix_small", 0, "view", 0)
        .link("fac", 0, "mix_big", 0)
        .link("red_big", 0, "mix_big", 1)
        .link("green_big", 0, "mix_big", 2)
        .link("mix_big", 0, "out", 0);

    let (system, report) = run_inline(&tree, false, false);
    assert_eq!(system.summary().resolution_conversions, 1);

    let view = report.output("view").unwrap();
    assert_eq!(view.resolution, Resolution::new(50, 50));
    assert_eq!(view.buffer.pixel(0, 0), Some(green));

    let out = report.output("out").unwrap();
    assert_eq!(out.resolution, Resolution::new(100, 100));
    for (x, y) in [(5, 5), (50, 50), (99, 0), (0, 99)] {
        assert_eq!(out.buffer.pixel(x, y), Some(green), "({x}, {y})");
    }
}
