use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use tessera_core::Resolution;

use crate::buffer::{MemoryBuffer, MemoryProxy};
use crate::error::GraphError;
use crate::ids::{ConnectionId, OperationId, ProxyId, SocketRef};
use crate::operation::{Connection, EvaluationContext, Operation, OperationKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub operation_count: usize,
    pub connection_count: usize,
    pub proxy_count: usize,
    pub compute_operations: usize,
    pub type_conversions: usize,
    pub resolution_conversions: usize,
    pub write_buffers: usize,
    pub read_buffers: usize,
    pub outputs: usize,
}

/// Arena of operations, connections and memory proxies for one execution.
///
/// Ids are indices and stay valid for the life of the graph: passes only
/// ever append operations and re-point connections, they never remove.
#[derive(Debug, Default)]
pub struct OperationGraph {
    operations: Vec<Operation>,
    connections: Vec<Connection>,
    proxies: Vec<MemoryProxy>,
}

impl OperationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_operation(&mut self, mut operation: Operation) -> OperationId {
        let id = OperationId(self.operations.len());
        operation.id = id;
        self.operations.push(operation);
        id
    }

    pub fn operation(&self, id: OperationId) -> Result<&Operation, GraphError> {
        self.operations
            .get(id.0)
            .ok_or(GraphError::UnknownOperation(id))
    }

    pub fn operation_mut(&mut self, id: OperationId) -> Result<&mut Operation, GraphError> {
        self.operations
            .get_mut(id.0)
            .ok_or(GraphError::UnknownOperation(id))
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: ConnectionId) -> Result<&Connection, GraphError> {
        self.connections
            .get(id.0)
            .ok_or(GraphError::UnknownConnection(id))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn proxies(&self) -> &[MemoryProxy] {
        &self.proxies
    }

    pub fn proxy(&self, id: ProxyId) -> Option<&MemoryProxy> {
        self.proxies.get(id.0)
    }

    pub fn proxy_mut(&mut self, id: ProxyId) -> Option<&mut MemoryProxy> {
        self.proxies.get_mut(id.0)
    }

    fn check_output(&self, socket: SocketRef) -> Result<(), GraphError> {
        match self.operations.get(socket.operation.0) {
            Some(op) if socket.index < op.outputs.len() => Ok(()),
            _ => Err(GraphError::UnknownOutput(socket)),
        }
    }

    fn check_input(&self, socket: SocketRef) -> Result<(), GraphError> {
        match self.operations.get(socket.operation.0) {
            Some(op) if socket.index < op.inputs.len() => Ok(()),
            _ => Err(GraphError::UnknownInput(socket)),
        }
    }

    /// Link an output socket to an unconnected input socket.
    pub fn connect(&mut self, from: SocketRef, to: SocketRef) -> Result<ConnectionId, GraphError> {
        self.check_output(from)?;
        self.check_input(to)?;
        if self.operations[to.operation.0].inputs[to.index].is_connected() {
            return Err(GraphError::InputAlreadyConnected(to));
        }

        let id = ConnectionId(self.connections.len());
        self.connections.push(Connection { from, to });
        self.operations[from.operation.0].outputs[from.index]
            .connections
            .push(id);
        self.operations[to.operation.0].inputs[to.index].connection = Some(id);
        Ok(id)
    }

    /// Output socket feeding the given input, if any.
    pub fn input_source(&self, to: SocketRef) -> Option<SocketRef> {
        let op = self.operations.get(to.operation.0)?;
        let connection = op.inputs.get(to.index)?.connection?;
        Some(self.connections[connection.0].from)
    }

    /// Input sockets fed by the given output, in connection order.
    pub fn consumers(&self, from: SocketRef) -> Vec<SocketRef> {
        self.operations
            .get(from.operation.0)
            .and_then(|op| op.outputs.get(from.index))
            .map(|socket| {
                socket
                    .connections
                    .iter()
                    .map(|c| self.connections[c.0].to)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Re-point an existing connection so it originates from `new_from`.
    pub fn set_connection_source(
        &mut self,
        connection: ConnectionId,
        new_from: SocketRef,
    ) -> Result<(), GraphError> {
        self.check_output(new_from)?;
        let old_from = self.connection(connection)?.from;
        self.operations[old_from.operation.0].outputs[old_from.index]
            .connections
            .retain(|c| *c != connection);
        self.operations[new_from.operation.0].outputs[new_from.index]
            .connections
            .push(connection);
        self.connections[connection.0].from = new_from;
        Ok(())
    }

    /// Interpose a one-in/one-out operation on an existing connection.
    ///
    /// The existing connection keeps its consumer and now starts at the new
    /// operation; a fresh connection feeds the new operation from the old producer.
    pub fn insert_on_connection(
        &mut self,
        connection: ConnectionId,
        operation: Operation,
    ) -> Result<OperationId, GraphError> {
        let producer = self.connection(connection)?.from;
        let inserted = self.add_operation(operation);
        self.set_connection_source(connection, SocketRef::new(inserted, 0))?;
        self.connect(producer, SocketRef::new(inserted, 0))?;
        Ok(inserted)
    }

    /// Write-buffer already attached to the given output, if any.
    pub fn find_attached_write_buffer(&self, output: SocketRef) -> Option<OperationId> {
        self.consumers(output)
            .into_iter()
            .map(|to| to.operation)
            .find(|op| self.operations[op.0].is_write_buffer())
    }

    /// Create a write-buffer and its proxy, fed from `source`. The buffer
    /// takes the producer's resolution.
    pub fn add_write_buffer(&mut self, source: SocketRef) -> Result<OperationId, GraphError> {
        self.check_output(source)?;
        let producer = &self.operations[source.operation.0];
        let data_type = producer.outputs[source.index].data_type;
        let resolution = producer.resolution();

        let proxy = ProxyId(self.proxies.len());
        let writer = self.add_operation(Operation::write_buffer(data_type, proxy));
        self.proxies.push(MemoryProxy {
            id: proxy,
            writer,
            data_type,
            resolution,
            executor: None,
            buffer: None,
        });
        self.connect(source, SocketRef::new(writer, 0))?;
        self.operations[writer.0].set_resolution(resolution);
        debug!("Added write-buffer {} ({}) for {}", writer, resolution, source);
        Ok(writer)
    }

    /// Create a read-buffer on an existing proxy. Its resolution is read
    /// from the proxy's write-buffer.
    pub fn add_read_buffer(&mut self, proxy: ProxyId) -> Result<OperationId, GraphError> {
        let (writer, data_type) = match self.proxies.get(proxy.0) {
            Some(p) => (p.writer, p.data_type),
            None => return Err(GraphError::UnknownProxy(proxy)),
        };
        let resolution = self.operations[writer.0].resolution();
        let reader = self.add_operation(Operation::read_buffer(data_type, proxy));
        self.operations[reader.0].set_resolution(resolution);
        Ok(reader)
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            operation_count: self.operations.len(),
            connection_count: self.connections.len(),
            proxy_count: self.proxies.len(),
            ..Default::default()
        };
        for op in &self.operations {
            match op.kind {
                OperationKind::Compute(_) => stats.compute_operations += 1,
                OperationKind::TypeConversion { .. } => stats.type_conversions += 1,
                OperationKind::ResolutionConversion { .. } => stats.resolution_conversions += 1,
                OperationKind::WriteBuffer { .. } => stats.write_buffers += 1,
                OperationKind::ReadBuffer { .. } => stats.read_buffers += 1,
                OperationKind::Output(_) => stats.outputs += 1,
            }
        }
        stats
    }

    // ── Execution lifecycle ─────────────────────────────────────────

    /// Number read-buffers sequentially in arena order. Returns the count.
    pub fn assign_read_buffer_offsets(&mut self) -> usize {
        let mut order = 0;
        for op in &mut self.operations {
            if let OperationKind::ReadBuffer { offset, .. } = &mut op.kind {
                *offset = Some(order);
                order += 1;
            }
        }
        order
    }

    /// Allocate proxy and output storage and initialize compute operations.
    pub fn init_operations(&mut self, context: &EvaluationContext) {
        for proxy in &mut self.proxies {
            if !proxy.resolution.is_degenerate() {
                proxy.buffer = Some(Arc::new(MemoryBuffer::new(
                    proxy.resolution,
                    proxy.data_type,
                )));
            }
        }
        for op in &mut self.operations {
            let resolution = op.resolution();
            let data_type = op.sink_data_type();
            match &mut op.kind {
                OperationKind::Compute(inner) => inner.init_execution(context),
                OperationKind::Output(target) if !resolution.is_degenerate() => {
                    target.buffer = Some(Arc::new(MemoryBuffer::new(resolution, data_type)));
                }
                _ => {}
            }
        }
    }

    /// Point every read-buffer at its proxy's allocated buffer.
    pub fn prime_read_buffers(&mut self) {
        let proxies = &self.proxies;
        for op in &mut self.operations {
            if let OperationKind::ReadBuffer { proxy, buffer, .. } = &mut op.kind {
                *buffer = proxies.get(proxy.0).and_then(|p| p.buffer.clone());
            }
        }
    }

    /// Release all runtime storage and deinitialize compute operations.
    pub fn deinit_operations(&mut self) {
        for op in &mut self.operations {
            match &mut op.kind {
                OperationKind::Compute(inner) => inner.deinit_execution(),
                OperationKind::ReadBuffer { buffer, .. } => *buffer = None,
                OperationKind::Output(target) => target.buffer = None,
                _ => {}
            }
        }
        for proxy in &mut self.proxies {
            proxy.buffer = None;
        }
    }

    /// Storage a sink writes into: the proxy buffer for write-buffers, the
    /// target buffer for outputs.
    pub fn sink_buffer(&self, id: OperationId) -> Option<Arc<MemoryBuffer>> {
        let op = self.operations.get(id.0)?;
        match &op.kind {
            OperationKind::WriteBuffer { proxy } => self.proxies.get(proxy.0)?.buffer.clone(),
            OperationKind::Output(target) => target.buffer.clone(),
            _ => None,
        }
    }

    /// Resolution of the producer feeding `to`, or zero when unconnected.
    pub fn input_resolution(&self, to: SocketRef) -> Resolution {
        self.input_source(to)
            .map(|from| self.operations[from.operation.0].resolution())
            .unwrap_or(Resolution::ZERO)
    }
}
