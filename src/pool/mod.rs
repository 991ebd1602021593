//! Bounded worker pool for publish tasks.
//!
//! At most `max_workers` jobs run at once. `submit` waits for a free slot,
//! so a slow broker backs up the submitter instead of piling up concurrent
//! work. Slots are handed out in FIFO order.
//!
//! Workers are tokio tasks kept on a LIFO ready list after finishing a job.
//! A worker that sees no job for `idle_timeout` removes itself and exits;
//! the next submission spawns a fresh one.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Returned by `submit` after `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker pool is closed")]
pub struct PoolClosed;

#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    max_workers: usize,
    idle_timeout: Duration,
    slots: Arc<Semaphore>,
    ready: Mutex<Vec<IdleWorker>>,
    workers: AtomicUsize,
    next_id: AtomicU64,
}

struct IdleWorker {
    id: u64,
    tx: mpsc::Sender<Job>,
}

struct Job {
    task: Task,
    // Released only after the worker is back on the ready list.
    permit: OwnedSemaphorePermit,
}

impl WorkerPool {
    pub fn new(max_workers: usize, idle_timeout: Duration) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            inner: Arc::new(PoolInner {
                max_workers,
                idle_timeout,
                slots: Arc::new(Semaphore::new(max_workers)),
                ready: Mutex::new(Vec::new()),
                workers: AtomicUsize::new(0),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Run `task` on a pool worker, waiting for a free slot first.
    pub async fn submit<F>(&self, task: F) -> Result<(), PoolClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = Arc::clone(&self.inner.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;
        let mut job = Job {
            task: Box::pin(task),
            permit,
        };

        loop {
            let idle = self.inner.ready_list().pop();
            let Some(worker) = idle else {
                self.inner.spawn_worker(job);
                return Ok(());
            };
            match worker.tx.try_send(job) {
                Ok(()) => {
                    trace!(worker = worker.id, "job handed to idle worker");
                    return Ok(());
                }
                // The worker exited after we popped it; try the next one.
                Err(TrySendError::Closed(returned)) | Err(TrySendError::Full(returned)) => {
                    job = returned;
                }
            }
        }
    }

    /// Refuse further submissions. Running jobs are not interrupted.
    pub fn close(&self) {
        self.inner.slots.close();
    }

    pub fn max_workers(&self) -> usize {
        self.inner.max_workers
    }

    /// Live worker tasks, busy or idle.
    pub fn active_workers(&self) -> usize {
        self.inner.workers.load(Ordering::SeqCst)
    }

    pub fn idle_workers(&self) -> usize {
        self.inner.ready_list().len()
    }

    /// Jobs that could start right now without waiting.
    pub fn available_slots(&self) -> usize {
        self.inner.slots.available_permits()
    }
}

impl PoolInner {
    fn ready_list(&self) -> std::sync::MutexGuard<'_, Vec<IdleWorker>> {
        self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_worker(self: &Arc<Self>, first: Job) {
        let inner = Arc::clone(self);
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, mut rx) = mpsc::channel::<Job>(1);
        inner.workers.fetch_add(1, Ordering::SeqCst);
        debug!(worker = id, "spawning pool worker");

        tokio::spawn(async move {
            let _guard = WorkerGuard {
                inner: Arc::clone(&inner),
                id,
            };
            let mut next = Some(first);
            while let Some(Job { task, permit }) = next.take() {
                task.await;
                inner.ready_list().push(IdleWorker { id, tx: tx.clone() });
                drop(permit);
                next = inner.wait_for_job(id, &mut rx).await;
            }
        });
    }

    async fn wait_for_job(&self, id: u64, rx: &mut mpsc::Receiver<Job>) -> Option<Job> {
        loop {
            match tokio::time::timeout(self.idle_timeout, rx.recv()).await {
                Ok(job) => return job,
                Err(_) => {
                    let mut ready = self.ready_list();
                    if let Some(pos) = ready.iter().position(|w| w.id == id) {
                        ready.remove(pos);
                        return None;
                    }
                    // A submitter already popped us; its job is on the way.
                }
            }
        }
    }
}

struct WorkerGuard {
    inner: Arc<PoolInner>,
    id: u64,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.inner.workers.fetch_sub(1, Ordering::SeqCst);
        debug!(worker = self.id, "pool worker exited");
    }
}
