//! Bounded async work queue with supervised workers
//!
//! The cached mutation path schedules its persistence step here instead of
//! spawning unsupervised tasks. The queue is bounded: when it saturates,
//! [`AsyncExecutor::try_run_async`] reports rejection so the caller can fall
//! back to inline persistence rather than dropping durability. A shutdown
//! flag rejects new submissions while letting queued work drain; `reset`
//! re-enables submission for hot reload.

use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Instant;
use tracing::warn;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Task queue for fire-and-forget and bounded-wait work
pub struct AsyncExecutor {
    queue: mpsc::Sender<Job>,
    shutdown: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

impl AsyncExecutor {
    /// Spawn the worker pool and return the executor handle
    ///
    /// `workers == 0` selects hardware parallelism. Must run inside a tokio
    /// runtime.
    pub fn start(queue_capacity: usize, workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };

        let (tx, rx) = mpsc::channel::<Job>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let in_flight = Arc::new(AtomicUsize::new(0));

        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => {
                            job.await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        }
                        None => break,
                    }
                }
            });
        }

        Self {
            queue: tx,
            shutdown: AtomicBool::new(false),
            in_flight,
        }
    }

    /// Submit fire-and-forget work, reporting rejection to the caller
    pub fn try_run_async<F>(&self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(Error::ExecutorRejected("executor is shut down".into()));
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.queue.try_send(Box::pin(task)).map_err(|err| {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match err {
                mpsc::error::TrySendError::Full(_) => {
                    Error::ExecutorRejected("work queue is full".into())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    Error::ExecutorRejected("work queue is closed".into())
                }
            }
        })
    }

    /// Submit fire-and-forget work; rejection is logged, never propagated
    pub fn run_async<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Err(err) = self.try_run_async(task) {
            warn!("async task rejected: {err}");
        }
    }

    /// Submit work producing a value and return a handle to await it
    pub fn supply_async<T, F>(&self, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.try_run_async(async move {
            let _ = tx.send(task.await);
        })?;
        Ok(TaskHandle { receiver: rx })
    }

    /// Bounded wait: run `task` through the pool, returning `default` on
    /// timeout or rejection
    pub async fn supply_with_timeout<T, F>(&self, timeout: Duration, default: T, task: F) -> T
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let handle = match self.supply_async(task) {
            Ok(handle) => handle,
            Err(_) => return default,
        };
        match tokio::time::timeout(timeout, handle.receiver).await {
            Ok(Ok(value)) => value,
            _ => default,
        }
    }

    /// Execute inline on the calling thread
    ///
    /// Hosts with a dedicated main thread marshal there in their own
    /// embedding layer; the core has no such thread.
    pub fn run_sync<T>(&self, task: impl FnOnce() -> T) -> T {
        task()
    }

    /// Reject new submissions; queued work keeps draining
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Re-enable submissions after a shutdown
    pub fn reset(&self) {
        self.shutdown.store(false, Ordering::SeqCst);
    }

    /// Whether new submissions are rejected
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Queued plus running task count
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until all submitted work has completed, up to `wait`
    ///
    /// Returns false when the deadline elapsed with work still pending.
    pub async fn drain(&self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }
}

/// Handle for a value produced by [`AsyncExecutor::supply_async`]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Await the task's value
    pub async fn join(self) -> Result<T> {
        self.receiver
            .await
            .map_err(|_| Error::ExecutorRejected("task dropped before completing".into()))
    }
}
