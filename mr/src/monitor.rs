use std::collections::HashMap;
use std::future::Future;

use tokio::task::AbortHandle;
use tokio::time::{sleep, Duration};
use tracing::trace;

use crate::task::TaskKind;

/// One-shot expiry timers, one per outstanding task.
///
/// The monitor only schedules; what happens on expiry is the future handed to
/// [`TimeoutMonitor::arm`], which the coordinator builds to re-enter its own lock.
#[derive(Debug)]
pub struct TimeoutMonitor {
    timeout: Duration,
    timers: HashMap<(TaskKind, usize), AbortHandle>,
}

impl TimeoutMonitor {
    pub fn new(timeout: Duration) -> Self {
        TimeoutMonitor {
            timeout,
            timers: HashMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `on_expire` after the timeout unless cancelled first.
    /// Re-arming a task replaces its previous timer.
    pub fn arm<F>(&mut self, kind: TaskKind, index: usize, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let timeout = self.timeout;
        let handle = tokio::spawn(async move {
            sleep(timeout).await;
            on_expire.await;
        });
        trace!(%kind, index, ?timeout, "timer armed");
        if let Some(old) = self.timers.insert((kind, index), handle.abort_handle()) {
            old.abort();
        }
    }

    pub fn cancel(&mut self, kind: TaskKind, index: usize) {
        if let Some(handle) = self.timers.remove(&(kind, index)) {
            handle.abort();
            trace!(%kind, index, "timer cancelled");
        }
    }

    /// Forgets a timer that has fired.
    pub fn expired(&mut self, kind: TaskKind, index: usize) {
        self.timers.remove(&(kind, index));
    }

    pub fn armed(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for TimeoutMonitor {
    fn drop(&mut self) {
        for handle in self.timers.values() {
            handle.abort();
        }
    }
}
