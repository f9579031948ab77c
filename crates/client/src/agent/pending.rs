//! Work the host must wait for before tearing a worker down.

use std::collections::HashMap;
use std::future::Future;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::{Id, JoinSet};

use precache_core::Error;

/// How one registered task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct TaskOutcome {
    pub label: String,
    /// Error message if the task failed or panicked.
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct Tasks {
    set: JoinSet<TaskOutcome>,
    /// Labels by task id, for tasks that end without an outcome.
    labels: HashMap<Id, String>,
}

/// Collection of spawned tasks with observable outcomes.
#[derive(Debug, Default)]
pub struct PendingWork {
    tasks: Mutex<Tasks>,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` and keep it until the next [`drain`](Self::drain).
    pub async fn wait_until<F>(&self, label: &str, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        let owned = label.to_string();
        let handle = tasks.set.spawn(async move {
            let error = work.await.err().map(|e| e.to_string());
            TaskOutcome { label: owned, error }
        });
        tasks.labels.insert(handle.id(), label.to_string());
    }

    /// Number of tasks not yet drained.
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.set.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.set.is_empty()
    }

    /// Await every registered task, including tasks registered while draining.
    pub async fn drain(&self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let Tasks { mut set, mut labels } = std::mem::take(&mut *self.tasks.lock().await);
            if set.is_empty() {
                break;
            }
            while let Some(joined) = set.join_next_with_id().await {
                match joined {
                    Ok((_, outcome)) => outcomes.push(outcome),
                    Err(e) => {
                        let label = labels.remove(&e.id()).unwrap_or_default();
                        tracing::error!(task = %label, "pending task did not complete: {e}");
                        outcomes.push(TaskOutcome { label, error: Some(e.to_string()) });
                    }
                }
            }
        }
        outcomes
    }
}
