//! Fixed-size pool for CPU-bound tasks.
//!
//! `size` async workers pull from one shared queue and run each task on
//! tokio's blocking thread pool, so at most `size` tasks execute at once.
//! Results flow back over a channel in completion order. A panicking task is
//! reported as [`TaskFailure::Panicked`] and the worker moves on; nothing is
//! retried.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

/// Default number of concurrent workers.
pub const DEFAULT_WORKER_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled")]
    Cancelled,
}

/// The outcome of one submitted task, tagged with its key.
#[derive(Debug)]
pub struct TaskResult<K, T> {
    pub key: K,
    pub outcome: Result<T, TaskFailure>,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COUNT)
    }
}

impl WorkerPool {
    /// A pool of `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `work` over every task and collect exactly one result per task,
    /// in completion order.
    pub async fn run<K, I, T, F>(&self, tasks: Vec<(K, I)>, work: F) -> Vec<TaskResult<K, T>>
    where
        K: Clone + Send + 'static,
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(&K, I) -> T + Send + Sync + 'static,
    {
        let total = tasks.len();
        let workers = self.size.min(total);
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let work = Arc::new(work);
        let (tx, mut rx) = mpsc::unbounded_channel();

        tracing::debug!(total, workers, "Starting worker pool");

        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let work = Arc::clone(&work);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut completed = 0usize;
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some((key, input)) = next else { break };

                    let work = Arc::clone(&work);
                    let task_key = key.clone();
                    let outcome =
                        match tokio::task::spawn_blocking(move || work(&task_key, input)).await {
                            Ok(value) => Ok(value),
                            Err(e) if e.is_panic() => {
                                Err(TaskFailure::Panicked(panic_message(e.into_panic())))
                            }
                            Err(_) => Err(TaskFailure::Cancelled),
                        };

                    completed += 1;
                    if tx.send(TaskResult { key, outcome }).is_err() {
                        break;
                    }
                }
                tracing::trace!(worker_id, completed, "Worker finished");
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
