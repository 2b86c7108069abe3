use serde::Serialize;
use tracing::debug;

use tessera_graph::{GraphError, OperationGraph, OperationId, ProxyId, SocketRef};

/// Buffers added by [`add_buffers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferingStats {
    pub complex_operations: usize,
    pub write_buffers: usize,
    pub read_buffers: usize,
}

/// Surround every complex operation with write/read-buffers so it only
/// ever samples fully computed memory and its result is computed once.
pub fn add_buffers(graph: &mut OperationGraph) -> Result<BufferingStats, GraphError> {
    let before = graph.stats();
    let complex: Vec<OperationId> = graph
        .operations()
        .iter()
        .filter(|op| op.is_complex())
        .map(|op| op.id)
        .collect();

    for &id in &complex {
        add_input_buffers(graph, id)?;
        add_output_buffers(graph, id)?;
    }

    let after = graph.stats();
    Ok(BufferingStats {
        complex_operations: complex.len(),
        write_buffers: after.write_buffers - before.write_buffers,
        read_buffers: after.read_buffers - before.read_buffers,
    })
}

fn attached_proxy(graph: &mut OperationGraph, output: SocketRef) -> Result<ProxyId, GraphError> {
    let writer = match graph.find_attached_write_buffer(output) {
        Some(writer) => writer,
        None => graph.add_write_buffer(output)?,
    };
    graph
        .operation(writer)?
        .proxy()
        .ok_or(GraphError::UnknownOperation(writer))
}

/// Every connected input not already fed by a read-buffer is re-fed from a
/// new read-buffer on the producer's (possibly new) write-buffer.
fn add_input_buffers(graph: &mut OperationGraph, id: OperationId) -> Result<(), GraphError> {
    let input_count = graph.operation(id)?.inputs.len();
    for index in 0..input_count {
        let Some(connection) = graph.operation(id)?.inputs[index].connection else {
            continue;
        };
        let from = graph.connection(connection)?.from;
        if graph.operation(from.operation)?.is_read_buffer() {
            continue;
        }
        let proxy = attached_proxy(graph, from)?;
        let reader = graph.add_read_buffer(proxy)?;
        graph.set_connection_source(connection, SocketRef::new(reader, 0))?;
        debug!("Buffered input {}:{} through {} ({})", id, index, reader, proxy);
    }
    Ok(())
}

/// Each connected output gets one write-buffer; every other consumer is
/// moved onto its own read-buffer.
fn add_output_buffers(graph: &mut OperationGraph, id: OperationId) -> Result<(), GraphError> {
    let output_count = graph.operation(id)?.outputs.len();
    for index in 0..output_count {
        let output = SocketRef::new(id, index);
        if !graph.operation(id)?.outputs[index].is_connected() {
            continue;
        }
        let proxy = attached_proxy(graph, output)?;
        let connections = graph.operation(id)?.outputs[index].connections.clone();
        for connection in connections {
            let to = graph.connection(connection)?.to;
            if graph.operation(to.operation)?.is_write_buffer() {
                continue;
            }
            let reader = graph.add_read_buffer(proxy)?;
            graph.set_connection_source(connection, SocketRef::new(reader, 0))?;
            debug!("Buffered output {} -> {} through {}", output, to, reader);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tessera_core::Resolution;
    use tessera_graph::{Operation, OutputRole, ResolutionRule};

    use super::*;
    use crate::nodes::{BlurOp, CheckerOp};

    fn blur_chain(graph: &mut OperationGraph) -> (OperationId, OperationId, OperationId) {
        let src = graph.add_operation(Operation::compute(Arc::new(CheckerOp {
            resolution: Resolution::new(16, 16),
            cell: 4,
        })));
        let blur = graph.add_operation(Operation::compute(Arc::new(BlurOp::new(1))));
        let out = graph.add_operation(Operation::output(
            "out",
            OutputRole::Composite,
            ResolutionRule::Render(Resolution::new(16, 16)),
        ));
        graph.connect(SocketRef::new(src, 0), SocketRef::new(blur, 0)).unwrap();
        graph.connect(SocketRef::new(blur, 0), SocketRef::new(out, 0)).unwrap();
        graph.determine_resolution(out, Resolution::ZERO).unwrap();
        (src, blur, out)
    }

    #[test]
    fn complex_operation_is_surrounded() {
        let mut graph = OperationGraph::new();
        let (src, blur, out) = blur_chain(&mut graph);

        let stats = add_buffers(&mut graph).unwrap();
        assert_eq!(stats.write_buffers, 2);
        assert_eq!(stats.read_buffers, 2);

        let feeding_blur = graph.input_source(SocketRef::new(blur, 0)).unwrap().operation;
        assert!(graph.operation(feeding_blur).unwrap().is_read_buffer());
        let feeding_out = graph.input_source(SocketRef::new(out, 0)).unwrap().operation;
        assert!(graph.operation(feeding_out).unwrap().is_read_buffer());
        assert!(graph.find_attached_write_buffer(SocketRef::new(src, 0)).is_some());
        assert!(graph.find_attached_write_buffer(SocketRef::new(blur, 0)).is_some());
    }

    #[test]
    fn second_run_adds_nothing() {
        let mut graph = OperationGraph::new();
        blur_chain(&mut graph);
        add_buffers(&mut graph).unwrap();
        let again = add_buffers(&mut graph).unwrap();
        assert_eq!(again.write_buffers, 0);
        assert_eq!(again.read_buffers, 0);
    }

    #[test]
    fn buffers_inherit_producer_resolution() {
        let mut graph = OperationGraph::new();
        blur_chain(&mut graph);
        add_buffers(&mut graph).unwrap();
        for op in graph.operations() {
            if op.is_read_buffer() || op.is_write_buffer() {
                assert_eq!(op.resolution(), Resolution::new(16, 16));
            }
        }
    }
}
