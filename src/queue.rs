//! Worker Queue — a bounded FIFO dispatching jobs to a fixed pool of
//! OS-thread-pinned workers.
//!
//! Each worker is a dedicated `std::thread`, not a tokio task: the native
//! image library this queue exists to serialize access to keeps
//! thread-local state that must not migrate across OS threads, which a
//! tokio task scheduled onto a multi-threaded runtime cannot guarantee.
//! Submission crosses from async handler code into the thread pool over a
//! bounded `crossbeam-channel`; results come back on a one-shot
//! `tokio::sync::oneshot` channel so the async caller can race the result
//! against its own cancellation without blocking its executor.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// How often an idle worker wakes to re-check the shutdown flag.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue full")]
    QueueFull,
    #[error("worker pool shutting down")]
    Shutdown,
    #[error("request cancelled")]
    Cancelled,
}

struct Envelope<Job> {
    job: Job,
    cancel: CancellationToken,
    result_tx: oneshot::Sender<Job::Output>,
}

/// A unit of work submitted to the queue. `Output` is produced on the
/// worker thread and carried back over a one-shot channel.
pub trait WorkItem: Send + 'static {
    type Output: Send + 'static;
}

/// Bounded worker queue. Constructed with a fixed worker count and a
/// handler function executed on each worker's pinned OS thread.
pub struct WorkerQueue<J: WorkItem> {
    tx: crossbeam_channel::Sender<Envelope<J>>,
    shutdown: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<J: WorkItem> WorkerQueue<J> {
    /// `worker_count` pinned OS threads; intake capacity is `4 *
    /// worker_count` per spec.md §4.1.
    pub fn new<H>(worker_count: usize, handler: H) -> Self
    where
        H: Fn(J) -> J::Output + Send + Sync + 'static,
    {
        let capacity = worker_count.saturating_mul(4).max(1);
        let (tx, rx) = crossbeam_channel::bounded::<Envelope<J>>(capacity);
        let shutdown = CancellationToken::new();
        let handler: Arc<dyn Fn(J) -> J::Output + Send + Sync> = Arc::new(handler);

        let shutdown_for_workers = shutdown.clone();
        let workers = (0..worker_count)
            .map(|id| {
                let rx = rx.clone();
                let handler = Arc::clone(&handler);
                let shutdown = shutdown_for_workers.clone();
                std::thread::Builder::new()
                    .name(format!("image-worker-{id}"))
                    .spawn(move || worker_loop(id, rx, handler, shutdown))
                    .expect("failed to spawn pinned worker thread")
            })
            .collect();

        Self {
            tx,
            shutdown,
            workers: Mutex::new(workers),
        }
    }

    /// Submit a job, racing the result against `cancel`. Never blocks past
    /// a full intake buffer: that case returns [`QueueError::QueueFull`]
    /// immediately rather than waiting for room.
    pub async fn process(&self, job: J, cancel: CancellationToken) -> Result<J::Output, QueueError> {
        if self.shutdown.is_cancelled() {
            return Err(QueueError::Shutdown);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let envelope = Envelope {
            job,
            cancel: cancel.clone(),
            result_tx,
        };

        match self.tx.try_send(envelope) {
            Ok(()) => {}
            Err(crossbeam_channel::TrySendError::Full(_)) => return Err(QueueError::QueueFull),
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                return Err(QueueError::Shutdown)
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            _ = self.shutdown.cancelled() => Err(QueueError::Shutdown),
            result = result_rx => result.map_err(|_| QueueError::Shutdown),
        }
    }

    /// Signal process-wide shutdown: submissions refuse new work
    /// immediately, and each worker finishes its current job (if any) and
    /// drains whatever is left in the intake buffer before exiting.
    /// Blocks until every worker thread has joined.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let handles = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop<J: WorkItem>(
    _id: usize,
    rx: crossbeam_channel::Receiver<Envelope<J>>,
    handler: Arc<dyn Fn(J) -> J::Output + Send + Sync>,
    shutdown: CancellationToken,
) {
    loop {
        match rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
            Ok(envelope) => {
                if envelope.cancel.is_cancelled() {
                    // The result channel is dropped silently; the caller
                    // already gave up and is not waiting on it.
                    continue;
                }
                let output = handler(envelope.job);
                // Capacity-1 buffered by construction (oneshot): a dropped
                // receiver here means the caller cancelled after enqueue
                // but before completion, and the result is simply
                // discarded without blocking this worker.
                let _ = envelope.result_tx.send(output);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if shutdown.is_cancelled() {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }
}
