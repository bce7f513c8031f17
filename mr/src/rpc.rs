use super::task::{TaskAssignment, TaskKind};

#[tarpc::service]
pub trait Rpc {
    /// Hand out the next task of the open phase, or tell the worker to wait or exit.
    async fn get_task() -> TaskAssignment;
    /// Report a finished task. Stale and duplicate reports are ignored.
    async fn task_done(kind: TaskKind, index: usize, attempt: u32);
    async fn done() -> bool;
}
