use futures::{future, lock::Mutex, prelude::*};
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Weak},
};
use tarpc::{
    context,
    server::{self, Channel},
    tokio_serde::formats::Json,
};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::JobConfig;
use crate::error::Result;
use crate::monitor::TimeoutMonitor;
use crate::store::TaskStore;
use crate::task::{Phase, TaskAssignment, TaskKind, TaskStatus};

const DONE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the coordinator mutates. Only ever touched under the one lock in
/// [`Coordinator`], by the three remote operations and by expiring timers.
#[derive(Debug)]
struct Scheduler {
    store: TaskStore,
    monitor: TimeoutMonitor,
}

impl Scheduler {
    fn assignment(&self, kind: TaskKind, index: usize, attempt: u32) -> TaskAssignment {
        match kind {
            TaskKind::Map => TaskAssignment::Map {
                index,
                attempt,
                // map tasks are always built with an input
                input: self
                    .store
                    .task(kind, index)
                    .and_then(|task| task.get_input())
                    .cloned()
                    .unwrap_or_default(),
                n_reduce: self.store.n_reduce(),
            },
            TaskKind::Reduce => TaskAssignment::Reduce { index, attempt },
        }
    }

    fn expire(&mut self, kind: TaskKind, index: usize, attempt: u32) {
        if self.store.mark_available(kind, index, attempt) {
            self.monitor.expired(kind, index);
            warn!(%kind, index, attempt, "task timed out, available for reassignment");
        }
    }
}

/// Shared handle to the scheduling state. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Coordinator {
    inner: Arc<Mutex<Scheduler>>,
}

impl Coordinator {
    pub fn new(inputs: Vec<PathBuf>, n_reduce: usize, task_timeout: Duration) -> Result<Self> {
        let mut config = JobConfig::new(inputs, n_reduce);
        config.task_timeout = task_timeout;
        Self::from_config(&config)
    }

    pub fn from_config(config: &JobConfig) -> Result<Self> {
        config.validate()?;
        info!(
            n_map = config.inputs.len(),
            n_reduce = config.n_reduce,
            timeout = ?config.task_timeout,
            "job created"
        );
        Ok(Coordinator {
            inner: Arc::new(Mutex::new(Scheduler {
                store: TaskStore::new(config.inputs.clone(), config.n_reduce),
                monitor: TimeoutMonitor::new(config.task_timeout),
            })),
        })
    }

    /// Picks the lowest-index available task of the open phase, advancing the
    /// phase first if it has just completed.
    pub async fn get_task(&self) -> TaskAssignment {
        let mut scheduler = self.inner.lock().await;
        loop {
            let phase = scheduler.store.phase();
            let kind = match phase.task_kind() {
                Some(kind) => kind,
                None => return TaskAssignment::Exit,
            };

            if let Some(index) = scheduler.store.next_available(kind) {
                let attempt = match scheduler.store.mark_assigned(kind, index) {
                    Some(attempt) => attempt,
                    None => return TaskAssignment::Wait,
                };
                let weak = Arc::downgrade(&self.inner);
                scheduler
                    .monitor
                    .arm(kind, index, expire_later(weak, kind, index, attempt));
                debug!(%kind, index, attempt, "task assigned");
                return scheduler.assignment(kind, index, attempt);
            }

            let next = scheduler.store.advance();
            if next == phase {
                return TaskAssignment::Wait;
            }
            info!(from = ?phase, to = ?next, "phase advanced");
        }
    }

    /// Accepts the report only from the attempt currently outstanding.
    pub async fn task_done(&self, kind: TaskKind, index: usize, attempt: u32) {
        let mut scheduler = self.inner.lock().await;
        if !scheduler.store.mark_completed_if_assigned(kind, index, attempt) {
            debug!(%kind, index, attempt, "ignoring stale or duplicate report");
            return;
        }
        scheduler.monitor.cancel(kind, index);
        debug!(%kind, index, attempt, "task completed");

        let phase = scheduler.store.phase();
        let next = scheduler.store.advance();
        if next != phase {
            info!(from = ?phase, to = ?next, "phase advanced");
        }
    }

    pub async fn done(&self) -> bool {
        self.inner.lock().await.store.phase() == Phase::Done
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.store.phase()
    }

    /// Status and latest attempt of one task.
    pub async fn task_status(&self, kind: TaskKind, index: usize) -> Option<(TaskStatus, u32)> {
        let scheduler = self.inner.lock().await;
        scheduler
            .store
            .task(kind, index)
            .map(|task| (task.get_status(), task.get_attempt()))
    }
}

async fn expire_later(weak: Weak<Mutex<Scheduler>>, kind: TaskKind, index: usize, attempt: u32) {
    if let Some(inner) = weak.upgrade() {
        inner.lock().await.expire(kind, index, attempt);
    }
}

#[derive(Clone)]
pub struct CoordinatorServer {
    coordinator: Coordinator,
    peer: Option<SocketAddr>,
}

impl crate::rpc::Rpc for CoordinatorServer {
    async fn get_task(self, _: context::Context) -> TaskAssignment {
        let assignment = self.coordinator.get_task().await;
        if let Some(kind) = assignment.kind() {
            debug!(peer = ?self.peer, %kind, "handing out task");
        }
        assignment
    }

    async fn task_done(self, _: context::Context, kind: TaskKind, index: usize, attempt: u32) {
        self.coordinator.task_done(kind, index, attempt).await
    }

    async fn done(self, _: context::Context) -> bool {
        self.coordinator.done().await
    }
}

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

/// Binds the listener and serves in the background. Returns the bound address.
pub async fn serve(
    coordinator: Coordinator,
    addr: SocketAddr,
    max_channels: usize,
) -> anyhow::Result<SocketAddr> {
    // JSON transport is provided by the json_transport tarpc module. It makes it easy
    // to start up a serde-powered json serialization strategy over TCP.
    let mut listener = tarpc::serde_transport::tcp::listen(&addr, Json::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);
    let local_addr = listener.local_addr();
    info!(%local_addr, "coordinator listening");

    let server_future = listener
        // Ignore accept errors.
        .filter_map(|r| future::ready(r.ok()))
        .map(server::BaseChannel::with_defaults)
        .map(move |channel| {
            let server = CoordinatorServer {
                coordinator: coordinator.clone(),
                peer: channel.transport().peer_addr().ok(),
            };
            channel
                .execute(crate::rpc::Rpc::serve(server))
                .for_each(spawn)
        })
        .buffer_unordered(max_channels)
        .for_each(|_| async {});
    tokio::spawn(server_future);

    Ok(local_addr)
}

/// Serves the job until every task has completed.
pub async fn run(config: JobConfig) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(&config)?;
    serve(coordinator.clone(), config.addr, config.max_channels).await?;

    while !coordinator.done().await {
        sleep(DONE_POLL_INTERVAL).await;
    }
    info!("all tasks completed");
    Ok(())
}
