use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum TaskStatus {
    Available,
    Assigned,
    Completed,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum TaskKind {
    Map,
    Reduce,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Map => write!(f, "map"),
            TaskKind::Reduce => write!(f, "reduce"),
        }
    }
}

/// Job-wide stage. Only ever moves forward: `Map -> Reduce -> Done`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    Map,
    Reduce,
    Done,
}

impl Phase {
    /// The task kind open for assignment in this phase.
    pub fn task_kind(self) -> Option<TaskKind> {
        match self {
            Phase::Map => Some(TaskKind::Map),
            Phase::Reduce => Some(TaskKind::Reduce),
            Phase::Done => None,
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::Map => Phase::Reduce,
            Phase::Reduce | Phase::Done => Phase::Done,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    index: usize,
    kind: TaskKind,
    status: TaskStatus,
    // 0 until first assignment, bumped on every AVAILABLE -> ASSIGNED
    attempt: u32,
    input: Option<PathBuf>,
}

impl Task {
    pub fn new_map(index: usize, input: PathBuf) -> Task {
        Task {
            index,
            kind: TaskKind::Map,
            status: TaskStatus::Available,
            attempt: 0,
            input: Some(input),
        }
    }

    pub fn new_reduce(index: usize) -> Task {
        Task {
            index,
            kind: TaskKind::Reduce,
            status: TaskStatus::Available,
            attempt: 0,
            input: None,
        }
    }

    pub fn get_index(&self) -> usize {
        self.index
    }

    pub fn get_kind(&self) -> TaskKind {
        self.kind
    }

    pub fn get_status(&self) -> TaskStatus {
        self.status
    }

    pub fn get_attempt(&self) -> u32 {
        self.attempt
    }

    pub fn get_input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// AVAILABLE -> ASSIGNED, returning the new attempt number.
    pub(crate) fn assign(&mut self) -> Option<u32> {
        if self.status != TaskStatus::Available {
            return None;
        }
        self.attempt += 1;
        self.status = TaskStatus::Assigned;
        Some(self.attempt)
    }

    /// ASSIGNED -> COMPLETED, only for the attempt currently outstanding.
    pub(crate) fn complete(&mut self, attempt: u32) -> bool {
        if self.status != TaskStatus::Assigned || self.attempt != attempt {
            return false;
        }
        self.status = TaskStatus::Completed;
        true
    }

    /// ASSIGNED -> AVAILABLE, only for the attempt currently outstanding.
    pub(crate) fn release(&mut self, attempt: u32) -> bool {
        if self.status != TaskStatus::Assigned || self.attempt != attempt {
            return false;
        }
        self.status = TaskStatus::Available;
        true
    }
}

/// The whole handoff from coordinator to worker for one `get_task` call.
#[derive(Debug, PartialEq, Eq, Clone, serde::Serialize, serde::Deserialize)]
pub enum TaskAssignment {
    Map {
        index: usize,
        attempt: u32,
        input: PathBuf,
        n_reduce: usize,
    },
    Reduce {
        index: usize,
        attempt: u32,
    },
    Wait,
    Exit,
}

impl TaskAssignment {
    pub fn kind(&self) -> Option<TaskKind> {
        match self {
            TaskAssignment::Map { .. } => Some(TaskKind::Map),
            TaskAssignment::Reduce { .. } => Some(TaskKind::Reduce),
            TaskAssignment::Wait | TaskAssignment::Exit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_transitions() {
        let mut task = Task::new_map(0, PathBuf::from("a.txt"));
        assert_eq!(task.get_status(), TaskStatus::Available);
        assert!(!task.complete(0));

        assert_eq!(task.assign(), Some(1));
        assert_eq!(task.assign(), None);
        assert!(task.release(1));
        assert_eq!(task.assign(), Some(2));

        // a report from the first attempt must not close the second
        assert!(!task.complete(1));
        assert!(task.complete(2));
        assert!(!task.release(2));
        assert_eq!(task.get_status(), TaskStatus::Completed);
    }

    #[test]
    fn test_phase_is_monotonic() {
        assert_eq!(Phase::Map.next(), Phase::Reduce);
        assert_eq!(Phase::Reduce.next(), Phase::Done);
        assert_eq!(Phase::Done.next(), Phase::Done);
        assert_eq!(Phase::Done.task_kind(), None);
    }
}
