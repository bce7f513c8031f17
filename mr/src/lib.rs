//! Fault-tolerant two-phase map/reduce scheduling.
//!
//! A single [`coordinator::Coordinator`] owns every task's state and hands
//! tasks to anonymous [`worker::Worker`]s over tarpc. A task that is not
//! reported within the timeout is handed out again with a new attempt number.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod partition;
pub mod rpc;
pub mod storage;
pub mod store;
pub mod task;
pub mod worker;

pub use coordinator::Coordinator;
pub use error::{MrError, Result};
pub use task::{Phase, TaskAssignment, TaskKind, TaskStatus};
pub use worker::Worker;
