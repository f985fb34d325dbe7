//! Supervision of background stream metering.
//!
//! Streamed responses are metered after the handler has returned. Each such
//! task is tracked here so shutdown can wait for pending usage commits.

use std::future::Future;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Tracker for detached metering tasks
#[derive(Debug, Clone, Default)]
pub struct MeteringTasks {
    tracker: TaskTracker,
}

impl MeteringTasks {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task that outlives the request handler
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Tasks still running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Close the tracker and wait up to `timeout` for running tasks.
    /// Returns true when everything finished in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            return true;
        }

        info!(pending, timeout = ?timeout, "Draining usage metering");
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            info!("Usage metering drained");
            true
        } else {
            warn!(
                remaining = self.tracker.len(),
                "Usage metering did not finish before shutdown"
            );
            false
        }
    }

    /// Wait for every task spawned so far, then keep accepting new ones
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
