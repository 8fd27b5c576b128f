//! Bounded worker pool for background provisioning jobs
//!
//! One task per submitted request, at most `max_workers` running at once.
//! Submission never waits: tasks queue on the pool's semaphore inside their
//! own spawned future.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A background task panicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPanic {
    message: String,
}

impl TaskPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TaskPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

impl std::error::Error for TaskPanic {}

/// Run a future, turning a panic into a [`TaskPanic`] value
pub async fn catch_panic<F>(future: F) -> Result<F::Output, TaskPanic>
where
    F: Future,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(TaskPanic::from_payload)
}

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_workers: usize,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// A pool size of zero is raised to one
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Tasks currently holding a worker slot
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Spawn `task` on the runtime; it starts once a worker slot is free.
    /// A panic inside the task is logged and reported through the handle.
    pub fn spawn<F>(&self, label: impl Into<String>, task: F) -> JoinHandle<Result<F::Output, TaskPanic>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let label = label.into();
        let permits = self.permits.clone();
        let active = self.active.clone();

        tokio::spawn(async move {
            // The pool never closes its semaphore, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            active.fetch_add(1, Ordering::SeqCst);
            debug!(task = %label, "Worker slot acquired");

            let result = catch_panic(task).await;

            active.fetch_sub(1, Ordering::SeqCst);
            if let Err(panic) = &result {
                error!(task = %label, panic = %panic.message(), "Background task panicked");
            }
            result
        })
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_workers", &self.max_workers)
            .field("active", &self.active_workers())
            .finish()
    }
}
