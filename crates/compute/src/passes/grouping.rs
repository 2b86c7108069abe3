use std::collections::HashSet;

use tracing::{debug, info};

use tessera_core::Priority;
use tessera_graph::{GraphError, GroupId, OperationGraph, OperationId, SocketRef};

use crate::context::ExecutionContext;
use crate::group::{ExecutionGroup, GroupKind};

/// Execution groups plus the primary group of every operation.
#[derive(Debug, Default)]
pub struct Grouping {
    pub groups: Vec<ExecutionGroup>,
    /// Indexed by operation; the first group that claimed it.
    pub primary: Vec<Option<GroupId>>,
}

/// Seed one group per output, then one per write-buffer, and let each
/// absorb its upstream operations up to and including read-buffers.
pub fn group_operations(
    graph: &mut OperationGraph,
    context: &ExecutionContext,
) -> Result<Grouping, GraphError> {
    let mut grouping = Grouping {
        groups: Vec::new(),
        primary: vec![None; graph.operation_count()],
    };

    let outputs: Vec<(OperationId, Priority)> = graph
        .operations()
        .iter()
        .filter(|op| op.is_output(context.rendering))
        .map(|op| (op.id, op.priority().unwrap_or_default()))
        .collect();
    for (sink, priority) in outputs {
        let id = GroupId::new(grouping.groups.len());
        let mut group = ExecutionGroup::new(id, GroupKind::Output, sink, priority);
        absorb(graph, &mut group, &mut grouping.primary)?;
        grouping.groups.push(group);
    }

    let writers: Vec<OperationId> = graph
        .operations()
        .iter()
        .filter(|op| op.is_write_buffer())
        .map(|op| op.id)
        .collect();
    for sink in writers {
        let id = GroupId::new(grouping.groups.len());
        let mut group = ExecutionGroup::new(id, GroupKind::Buffer, sink, Priority::Low);
        absorb(graph, &mut group, &mut grouping.primary)?;
        if let Some(proxy) = graph.operation(sink)?.proxy() {
            if let Some(proxy) = graph.proxy_mut(proxy) {
                proxy.executor = Some(id);
            }
        }
        grouping.groups.push(group);
    }

    resolve_dependencies(graph, &mut grouping.groups);
    propagate_priorities(&mut grouping.groups);

    for group in &mut grouping.groups {
        group.determine_resolution(graph);
        group.set_chunk_size(context.chunk_size);
        debug!(
            "{} ({:?}, {}): {} operations, {} dependencies, {}",
            group.id,
            group.kind,
            group.priority,
            group.operations.len(),
            group.dependencies.len(),
            group.resolution
        );
    }

    info!(
        "Grouped {} operations into {} groups ({} output, {} buffer)",
        graph.operation_count(),
        grouping.groups.len(),
        grouping.groups.iter().filter(|g| g.is_output()).count(),
        grouping.groups.iter().filter(|g| !g.is_output()).count()
    );
    Ok(grouping)
}

/// Backward walk from the group's sink through direct connections. Read
/// buffers are included but not crossed; their proxies become dependencies.
fn absorb(
    graph: &OperationGraph,
    group: &mut ExecutionGroup,
    primary: &mut [Option<GroupId>],
) -> Result<(), GraphError> {
    let mut stack = vec![group.sink];
    let mut seen = HashSet::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let op = graph.operation(id)?;
        group.operations.push(id);
        group.single_threaded |= op.flags.single_threaded;
        group.prefers_gpu |= op.flags.prefers_gpu;
        if let Some(slot) = primary.get_mut(id.index()) {
            slot.get_or_insert(group.id);
        }

        if op.is_read_buffer() {
            if let Some(proxy) = op.proxy() {
                if !group.read_proxies.contains(&proxy) {
                    group.read_proxies.push(proxy);
                }
            }
            continue;
        }
        for index in (0..op.inputs.len()).rev() {
            if let Some(source) = graph.input_source(SocketRef::new(id, index)) {
                stack.push(source.operation);
            }
        }
    }
    Ok(())
}

fn resolve_dependencies(graph: &OperationGraph, groups: &mut [ExecutionGroup]) {
    for group in groups.iter_mut() {
        group.dependencies = group
            .read_proxies
            .iter()
            .filter_map(|proxy| graph.proxy(*proxy).and_then(|p| p.executor))
            .collect();
    }
}

/// A buffer group runs at the most urgent priority among the groups that
/// (transitively) read it.
fn propagate_priorities(groups: &mut [ExecutionGroup]) {
    let mut changed = true;
    while changed {
        changed = false;
        for index in 0..groups.len() {
            let priority = groups[index].priority;
            let dependencies = groups[index].dependencies.clone();
            for dependency in dependencies {
                let target = &mut groups[dependency.index()];
                if priority < target.priority {
                    target.priority = priority;
                    changed = true;
                }
            }
        }
    }
}
