use std::future::Future;

use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinSet};
use tracing::{debug, error};

/// Background tasks owned by the broker, awaited as a group at shutdown.
pub struct TaskGroup {
    runtime: Handle,
    tasks: Mutex<JoinSet<()>>,
}

impl TaskGroup {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Spawns `task` on the broker's runtime.
    pub fn spawn<F>(
        &self,
        task: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        // Reap finished tasks so the set does not grow without bound.
        while let Some(result) = tasks.try_join_next() {
            log_join(result);
        }
        tasks.spawn_on(task, &self.runtime);
    }

    /// Number of tasks not yet awaited.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for every task spawned so far, including tasks spawned while
    /// waiting.
    pub async fn wait(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks.lock());
            if pending.is_empty() {
                break;
            }
            while let Some(result) = pending.join_next().await {
                log_join(result);
            }
        }
        debug!("all background tasks finished");
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "background task panicked");
        } else {
            debug!(error = %e, "background task cancelled");
        }
    }
}
