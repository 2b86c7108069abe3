use serde::Serialize;
use tracing::debug;

use tessera_core::{Priority, Rect, Resolution};
use tessera_graph::{GroupId, OperationGraph, OperationId, ProxyId, SocketRef};

use crate::error::ExecutionError;
use crate::scheduler::WorkPackage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    /// Ends in an output operation.
    Output,
    /// Ends in a write-buffer; runs on demand of the groups reading it.
    Buffer,
}

/// Lifecycle of an execution group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupState {
    Uninitialized,
    Initialized,
    Executing,
    Deinitialized,
}

/// A set of operations that is scheduled as a whole, chunk by chunk,
/// writing into the storage of its sink.
#[derive(Debug, Clone)]
pub struct ExecutionGroup {
    pub id: GroupId,
    pub kind: GroupKind,
    pub sink: OperationId,
    /// Sink first, then everything absorbed upstream.
    pub operations: Vec<OperationId>,
    /// Buffer groups whose proxies this group reads.
    pub dependencies: Vec<GroupId>,
    pub(crate) read_proxies: Vec<ProxyId>,
    pub priority: Priority,
    pub resolution: Resolution,
    pub chunk_size: u32,
    pub single_threaded: bool,
    pub prefers_gpu: bool,
    state: GroupState,
    completed: bool,
}

impl ExecutionGroup {
    pub fn new(id: GroupId, kind: GroupKind, sink: OperationId, priority: Priority) -> Self {
        Self {
            id,
            kind,
            sink,
            operations: Vec::new(),
            dependencies: Vec::new(),
            read_proxies: Vec::new(),
            priority,
            resolution: Resolution::ZERO,
            chunk_size: tessera_core::config::DEFAULT_CHUNK_SIZE,
            single_threaded: false,
            prefers_gpu: false,
            state: GroupState::Uninitialized,
            completed: false,
        }
    }

    pub fn is_output(&self) -> bool {
        self.kind == GroupKind::Output
    }

    pub fn contains(&self, op: OperationId) -> bool {
        self.operations.contains(&op)
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    /// All chunks ran to completion.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Group resolution is the resolution of its sink.
    pub fn determine_resolution(&mut self, graph: &OperationGraph) -> Resolution {
        self.resolution = graph
            .operation(self.sink)
            .map(|op| op.resolution())
            .unwrap_or(Resolution::ZERO);
        self.resolution
    }

    pub fn set_chunk_size(&mut self, chunk_size: u32) {
        self.chunk_size = chunk_size.max(1);
    }

    pub fn is_schedulable(&self) -> bool {
        !self.resolution.is_degenerate()
    }

    /// Row-major `chunk_size` squares covering the resolution, clipped at
    /// the right and bottom edges. Single-threaded groups get one chunk.
    pub fn chunks(&self) -> Vec<Rect> {
        if !self.is_schedulable() {
            return Vec::new();
        }
        if self.single_threaded {
            return vec![self.resolution.rect()];
        }
        let size = self.chunk_size;
        let Resolution { width, height } = self.resolution;
        let mut chunks = Vec::new();
        for y in (0..height).step_by(size as usize) {
            for x in (0..width).step_by(size as usize) {
                chunks.push(Rect::new(x, y, (x + size).min(width), (y + size).min(height)));
            }
        }
        chunks
    }

    pub fn work_packages(&self) -> Vec<WorkPackage> {
        self.chunks()
            .into_iter()
            .enumerate()
            .map(|(index, rect)| WorkPackage {
                group: self.id,
                index,
                rect,
            })
            .collect()
    }

    /// Evaluate every pixel of `rect` through the sink's input and store
    /// the block in the sink's buffer.
    pub fn render_chunk(&self, graph: &OperationGraph, rect: &Rect) {
        let Some(buffer) = graph.sink_buffer(self.sink) else {
            return;
        };
        let input = SocketRef::new(self.sink, 0);
        let mut pixels = Vec::with_capacity(rect.area());
        for y in rect.y_min..rect.y_max {
            for x in rect.x_min..rect.x_max {
                pixels.push(graph.sample_input(input, x as f32, y as f32));
            }
        }
        buffer.write_rect(rect, &pixels);
    }

    fn transition(&mut self, to: GroupState) -> Result<(), ExecutionError> {
        use GroupState::*;
        let allowed = matches!(
            (self.state, to),
            (Uninitialized, Initialized)
                | (Initialized, Executing)
                | (Executing, Deinitialized)
                | (Initialized, Deinitialized)
        );
        if !allowed {
            return Err(ExecutionError::InvalidTransition {
                group: self.id,
                from: self.state,
                to,
            });
        }
        debug!("{}: {:?} -> {:?}", self.id, self.state, to);
        self.state = to;
        Ok(())
    }

    pub fn init_execution(&mut self) -> Result<(), ExecutionError> {
        self.transition(GroupState::Initialized)
    }

    pub fn begin_execution(&mut self) -> Result<(), ExecutionError> {
        self.transition(GroupState::Executing)
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// Valid from `Executing`, or from `Initialized` when the group was never
    /// scheduled.
    pub fn deinit_execution(&mut self) -> Result<(), ExecutionError> {
        self.transition(GroupState::Deinitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(width: u32, height: u32, chunk: u32) -> ExecutionGroup {
        let mut g = ExecutionGroup::new(
            GroupId::new(0),
            GroupKind::Output,
            OperationId::new(0),
            Priority::High,
        );
        g.resolution = Resolution::new(width, height);
        g.set_chunk_size(chunk);
        g
    }

    #[test]
    fn chunks_cover_resolution_without_overlap() {
        let g = group(100, 70, 32);
        let chunks = g.chunks();
        assert_eq!(chunks.len(), 4 * 3);
        assert_eq!(chunks.iter().map(|r| r.area()).sum::<usize>(), 100 * 70);
        for (i, a) in chunks.iter().enumerate() {
            for b in &chunks[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
        assert_eq!(chunks[0], Rect::new(0, 0, 32, 32));
        assert_eq!(chunks[3], Rect::new(96, 0, 100, 32));
        assert_eq!(chunks[11], Rect::new(96, 64, 100, 70));
    }

    #[test]
    fn single_threaded_is_one_chunk() {
        let mut g = group(100, 70, 32);
        g.single_threaded = true;
        assert_eq!(g.chunks(), vec![Rect::new(0, 0, 100, 70)]);
    }

    #[test]
    fn degenerate_group_has_no_chunks() {
        let g = group(0, 70, 32);
        assert!(!g.is_schedulable());
        assert!(g.chunks().is_empty());
    }

    #[test]
    fn lifecycle_transitions() {
        let mut g = group(10, 10, 16);
        assert_eq!(g.state(), GroupState::Uninitialized);
        g.init_execution().unwrap();
        g.begin_execution().unwrap();
        g.deinit_execution().unwrap();
        assert_eq!(g.state(), GroupState::Deinitialized);
    }

    #[test]
    fn never_scheduled_group_can_deinit() {
        let mut g = group(10, 10, 16);
        g.init_execution().unwrap();
        g.deinit_execution().unwrap();
        assert_eq!(g.state(), GroupState::Deinitialized);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut g = group(10, 10, 16);
        assert!(matches!(
            g.begin_execution(),
            Err(ExecutionError::InvalidTransition {
                from: GroupState::Uninitialized,
                to: GroupState::Executing,
                ..
            })
        ));
        g.init_execution().unwrap();
        assert!(g.init_execution().is_err());
        g.deinit_execution().unwrap();
        assert!(g.begin_execution().is_err());
    }
}
