use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use tessera_core::Priority;
use tessera_graph::GroupId;

/// Ordered record of group execution, one sequence number per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    GroupStarted {
        seq: u64,
        group: GroupId,
        priority: Priority,
        chunks: usize,
    },
    GroupFinished {
        seq: u64,
        group: GroupId,
        priority: Priority,
        executed: usize,
        abandoned: usize,
    },
    GroupSkipped {
        seq: u64,
        group: GroupId,
        priority: Priority,
    },
}

/// Execution metrics for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionMetrics {
    pub chunks_executed: u64,
    pub chunks_abandoned: u64,
    /// Completed output and buffer groups per priority tier.
    pub groups_executed: HashMap<Priority, u64>,
    pub groups_skipped: u64,
    /// Wall time per group, keyed by group id.
    pub group_durations: HashMap<String, Duration>,
    pub events: Vec<ExecutionEvent>,
    #[serde(skip)]
    next_seq: u64,
}

impl ExecutionMetrics {
    fn seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn record_group_started(&mut self, group: GroupId, priority: Priority, chunks: usize) {
        let seq = self.seq();
        self.events.push(ExecutionEvent::GroupStarted {
            seq,
            group,
            priority,
            chunks,
        });
    }

    pub fn record_group_finished(
        &mut self,
        group: GroupId,
        priority: Priority,
        executed: usize,
        abandoned: usize,
        duration: Duration,
    ) {
        let seq = self.seq();
        self.chunks_executed += executed as u64;
        self.chunks_abandoned += abandoned as u64;
        if abandoned == 0 {
            *self.groups_executed.entry(priority).or_default() += 1;
        }
        self.group_durations.insert(group.to_string(), duration);
        self.events.push(ExecutionEvent::GroupFinished {
            seq,
            group,
            priority,
            executed,
            abandoned,
        });
    }

    pub fn record_group_skipped(&mut self, group: GroupId, priority: Priority) {
        let seq = self.seq();
        self.groups_skipped += 1;
        self.events.push(ExecutionEvent::GroupSkipped {
            seq,
            group,
            priority,
        });
    }

    /// Groups in the order they finished.
    pub fn finished_order(&self) -> Vec<GroupId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::GroupFinished { group, .. } => Some(*group),
                _ => None,
            })
            .collect()
    }

    /// Sequence number of the given group's start event.
    pub fn started_at(&self, group: GroupId) -> Option<u64> {
        self.events.iter().find_map(|e| match e {
            ExecutionEvent::GroupStarted { seq, group: g, .. } if *g == group => Some(*seq),
            _ => None,
        })
    }

    /// Sequence number of the given group's finish event.
    pub fn finished_at(&self, group: GroupId) -> Option<u64> {
        self.events.iter().find_map(|e| match e {
            ExecutionEvent::GroupFinished { seq, group: g, .. } if *g == group => Some(*seq),
            _ => None,
        })
    }
}
