use tracing::debug;

use tessera_core::Resolution;
use tessera_graph::{ConnectionId, GraphError, Operation, OperationGraph};

use crate::context::ExecutionContext;

/// Resolve every operation reachable from an output: non-preview outputs
/// first, so previews see the final sizes of shared upstream operations.
pub fn determine_resolutions(
    graph: &mut OperationGraph,
    context: &ExecutionContext,
) -> Result<(), GraphError> {
    let outputs: Vec<_> = graph
        .operations()
        .iter()
        .filter(|op| op.is_output(context.rendering))
        .map(|op| (op.id, op.is_preview()))
        .collect();

    for (id, _) in outputs.iter().filter(|(_, preview)| !preview) {
        let resolution = graph.determine_resolution(*id, Resolution::ZERO)?;
        debug!("Output {} resolved to {}", id, resolution);
    }
    for (id, _) in outputs.iter().filter(|(_, preview)| *preview) {
        let resolution = graph.determine_resolution(*id, Resolution::ZERO)?;
        debug!("Preview {} resolved to {}", id, resolution);
    }
    Ok(())
}

/// Insert one resolution conversion on every connection whose resolved
/// endpoints differ and whose consumer input allows resizing. Returns the
/// number of conversions added.
pub fn add_resolution_conversions(graph: &mut OperationGraph) -> Result<usize, GraphError> {
    let mut added = 0;
    for index in 0..graph.connection_count() {
        let connection = ConnectionId::new(index);
        let link = *graph.connection(connection)?;
        let producer = graph.operation(link.from.operation)?;
        let consumer = graph.operation(link.to.operation)?;
        if !producer.is_resolution_set() || !consumer.is_resolution_set() {
            continue;
        }
        if !graph.needs_resolution_conversion(link.to) {
            continue;
        }
        let socket = &consumer.inputs[link.to.index];
        let (source, target) = (producer.resolution(), consumer.resolution());
        let mut conversion =
            Operation::resolution_conversion(socket.data_type, socket.resize_mode, source, target);
        conversion.origin = consumer.origin.clone();
        let id = graph.insert_on_connection(connection, conversion)?;
        debug!("Inserted {} ({} -> {}) before {}", id, source, target, link.to);
        added += 1;
    }
    Ok(added)
}
