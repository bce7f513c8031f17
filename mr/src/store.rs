use std::path::PathBuf;

use crate::task::{Phase, Task, TaskKind, TaskStatus};

/// Authoritative record of every task and of the job phase.
///
/// Every operation is total: a call whose precondition does not hold (wrong
/// status, stale attempt, index out of range) is a no-op that reports `false`
/// or `None`. Duplicate and late reports are therefore safe to pass straight in.
#[derive(Debug, Clone)]
pub struct TaskStore {
    phase: Phase,
    map_tasks: Vec<Task>,
    reduce_tasks: Vec<Task>,
    n_reduce: usize,
}

impl TaskStore {
    pub fn new(inputs: Vec<PathBuf>, n_reduce: usize) -> Self {
        let map_tasks = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| Task::new_map(i, input))
            .collect();
        let reduce_tasks = (0..n_reduce).map(Task::new_reduce).collect();
        TaskStore {
            phase: Phase::Map,
            map_tasks,
            reduce_tasks,
            n_reduce,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn n_reduce(&self) -> usize {
        self.n_reduce
    }

    pub fn n_map(&self) -> usize {
        self.map_tasks.len()
    }

    pub fn tasks(&self, kind: TaskKind) -> &[Task] {
        match kind {
            TaskKind::Map => &self.map_tasks,
            TaskKind::Reduce => &self.reduce_tasks,
        }
    }

    pub fn task(&self, kind: TaskKind, index: usize) -> Option<&Task> {
        self.tasks(kind).get(index)
    }

    fn task_mut(&mut self, kind: TaskKind, index: usize) -> Option<&mut Task> {
        match kind {
            TaskKind::Map => self.map_tasks.get_mut(index),
            TaskKind::Reduce => self.reduce_tasks.get_mut(index),
        }
    }

    /// Lowest-index AVAILABLE task of `kind`.
    pub fn next_available(&self, kind: TaskKind) -> Option<usize> {
        self.tasks(kind)
            .iter()
            .position(|task| task.get_status() == TaskStatus::Available)
    }

    /// Returns the attempt number handed out, or `None` if the task was not AVAILABLE.
    pub fn mark_assigned(&mut self, kind: TaskKind, index: usize) -> Option<u32> {
        self.task_mut(kind, index).and_then(Task::assign)
    }

    /// Returns whether this call moved the task to COMPLETED.
    pub fn mark_completed_if_assigned(&mut self, kind: TaskKind, index: usize, attempt: u32) -> bool {
        self.task_mut(kind, index)
            .map_or(false, |task| task.complete(attempt))
    }

    /// Timeout path: returns whether the task went back to AVAILABLE.
    pub fn mark_available(&mut self, kind: TaskKind, index: usize, attempt: u32) -> bool {
        self.task_mut(kind, index)
            .map_or(false, |task| task.release(attempt))
    }

    pub fn phase_complete(&self, kind: TaskKind) -> bool {
        self.tasks(kind)
            .iter()
            .all(|task| task.get_status() == TaskStatus::Completed)
    }

    /// Recomputes completion of the open phase and moves forward while it is
    /// complete. Returns the resulting phase.
    pub fn advance(&mut self) -> Phase {
        while let Some(kind) = self.phase.task_kind() {
            if !self.phase_complete(kind) {
                break;
            }
            self.phase = self.phase.next();
        }
        self.phase
    }
}
