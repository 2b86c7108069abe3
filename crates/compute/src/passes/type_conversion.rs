use tracing::debug;

use tessera_graph::{ConnectionId, GraphError, Operation, OperationGraph};

/// Insert a type conversion on every connection whose endpoints disagree
/// on data type. Returns the number of conversions added.
pub fn add_type_conversions(graph: &mut OperationGraph) -> Result<usize, GraphError> {
    let mut added = 0;
    for index in 0..graph.connection_count() {
        let connection = ConnectionId::new(index);
        let link = *graph.connection(connection)?;
        let from_type = graph.operation(link.from.operation)?.outputs[link.from.index].data_type;
        let to_op = graph.operation(link.to.operation)?;
        let to_type = to_op.inputs[link.to.index].data_type;
        if from_type == to_type {
            continue;
        }
        let origin = to_op.origin.clone();
        let mut conversion = Operation::type_conversion(from_type, to_type);
        conversion.origin = origin;
        let id = graph.insert_on_connection(connection, conversion)?;
        debug!("Inserted {} on {} -> {}", id, link.from, link.to);
        added += 1;
    }
    Ok(added)
}
