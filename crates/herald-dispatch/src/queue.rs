// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async retry queue with a fixed worker pool.
//!
//! Tasks are consumed FIFO by N workers. A successful or non-retryable
//! outcome is terminal. A retryable failure sleeps `2^retry_count` seconds
//! (after incrementing the count, so the first retry waits 2s) and goes
//! back to the tail of the queue; a task that exhausts its retry budget is
//! dropped and logged. `stop()` waits for every task to reach a terminal
//! state before cancelling the workers, so shutdown loses nothing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_core::types::{DeliveryOutcome, DeliveryTask};

/// How long an idle worker waits before re-polling the queue.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// The delivery function workers call for each task.
pub type SendFn =
    Arc<dyn Fn(DeliveryTask) -> BoxFuture<'static, DeliveryOutcome> + Send + Sync>;

struct QueueState {
    tasks: Mutex<VecDeque<DeliveryTask>>,
    /// Signalled on push and re-enqueue.
    available: Notify,
    /// Tasks pushed but not yet terminal. Retries do not change it.
    pending: AtomicUsize,
    /// Signalled when `pending` reaches zero.
    drained: Notify,
}

/// FIFO delivery queue with retry backoff.
pub struct DeliveryQueue {
    state: Arc<QueueState>,
    cancel: CancellationToken,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(QueueState {
                tasks: Mutex::new(VecDeque::new()),
                available: Notify::new(),
                pending: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
            cancel: CancellationToken::new(),
            workers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawns `workers` worker tasks delivering through `send_fn`.
    pub fn start(&self, workers: usize, send_fn: SendFn) {
        let mut handles = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker_id in 0..workers {
            let state = Arc::clone(&self.state);
            let cancel = self.cancel.clone();
            let send_fn = Arc::clone(&send_fn);
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, state, cancel, send_fn).await;
            }));
        }
        info!(workers, "delivery queue started");
    }

    /// Appends a task to the queue tail.
    pub async fn push(&self, task: DeliveryTask) {
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        self.state.tasks.lock().await.push_back(task);
        self.state.available.notify_one();
    }

    /// Tasks pushed but not yet terminal, in-flight retries included.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// Waits for the queue to drain, then cancels and joins the workers.
    pub async fn stop(&self) {
        loop {
            let drained = self.state.drained.notified();
            tokio::pin!(drained);
            // Register as a waiter before reading the counter; a worker
            // finishing between the load and the await would otherwise
            // fire notify_waiters() with nobody listening, and no later
            // wakeup ever comes.
            drained.as_mut().enable();
            if self.state.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            drained.await;
        }
        self.cancel.cancel();

        let handles: Vec<_> = {
            let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        info!("delivery queue stopped");
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

async fn worker_loop(
    worker_id: usize,
    state: Arc<QueueState>,
    cancel: CancellationToken,
    send_fn: SendFn,
) {
    debug!(worker_id, "delivery worker started");
    loop {
        let task = tokio::select! {
            _ = cancel.cancelled() => break,
            task = next_task(&state) => task,
        };
        let Some(task) = task else { continue };
        process_task(&state, &send_fn, task).await;
    }
    debug!(worker_id, "delivery worker stopped");
}

/// Pops the next task, waiting at most [`POLL_TIMEOUT`] for one to appear.
async fn next_task(state: &QueueState) -> Option<DeliveryTask> {
    if let Some(task) = state.tasks.lock().await.pop_front() {
        return Some(task);
    }
    let _ = tokio::time::timeout(POLL_TIMEOUT, state.available.notified()).await;
    state.tasks.lock().await.pop_front()
}

async fn process_task(state: &QueueState, send_fn: &SendFn, mut task: DeliveryTask) {
    let outcome = send_fn(task.clone()).await;

    if outcome.success || !outcome.should_retry {
        if !outcome.success {
            debug!(
                recipient_id = task.recipient_id,
                notification_id = task.notification_id,
                message = %outcome.message,
                "delivery failed permanently"
            );
        }
        finish_task(state);
        return;
    }

    if task.retry_count >= task.max_retries {
        warn!(
            recipient_id = task.recipient_id,
            notification_id = task.notification_id,
            retries = task.retry_count,
            "dropping delivery after exhausting retries"
        );
        finish_task(state);
        return;
    }

    task.retry_count += 1;
    let delay = Duration::from_secs(1u64 << task.retry_count);
    debug!(
        recipient_id = task.recipient_id,
        retry = task.retry_count,
        delay_secs = delay.as_secs(),
        "re-queueing delivery"
    );
    tokio::time::sleep(delay).await;
    state.tasks.lock().await.push_back(task);
    state.available.notify_one();
}

fn finish_task(state: &QueueState) {
    if state.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
        state.drained.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn task(recipient_id: i64) -> DeliveryTask {
        DeliveryTask::new(1, recipient_id, "hello")
    }

    fn counting_send_fn(
        attempts: Arc<AtomicUsize>,
        outcome_for: impl Fn(i64, usize) -> DeliveryOutcome + Send + Sync + 'static,
    ) -> SendFn {
        Arc::new(move |task: DeliveryTask| {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = outcome_for(task.recipient_id, n);
            Box::pin(async move { outcome })
        })
    }

    fn retryable_failure(recipient_id: i64) -> DeliveryOutcome {
        DeliveryOutcome {
            success: false,
            recipient_id,
            category: Some(herald_core::types::ErrorCategory::ServerError),
            message: "Server error".to_string(),
            should_retry: true,
        }
    }

    fn permanent_failure(recipient_id: i64) -> DeliveryOutcome {
        DeliveryOutcome {
            success: false,
            recipient_id,
            category: Some(herald_core::types::ErrorCategory::UserBlocked),
            message: "blocked".to_string(),
            should_retry: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_is_terminal_after_one_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let queue = DeliveryQueue::new();
        queue.start(
            2,
            counting_send_fn(attempts.clone(), |id, _| DeliveryOutcome::delivered(id)),
        );

        queue.push(task(1)).await;
        queue.stop().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_is_terminal() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let queue = DeliveryQueue::new();
        queue.start(
            1,
            counting_send_fn(attempts.clone(), |id, _| permanent_failure(id)),
        );

        queue.push(task(1)).await;
        queue.stop().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_stops_after_max_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let queue = DeliveryQueue::new();
        queue.start(
            1,
            counting_send_fn(attempts.clone(), |id, _| retryable_failure(id)),
        );

        queue.push(task(1)).await;
        queue.stop().await;
        // Initial attempt plus max_retries re-deliveries.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_on_second_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let queue = DeliveryQueue::new();
        queue.start(
            1,
            counting_send_fn(attempts.clone(), |id, n| {
                if n == 1 {
                    retryable_failure(id)
                } else {
                    DeliveryOutcome::delivered(id)
                }
            }),
        );

        queue.push(task(1)).await;
        queue.stop().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drains_every_queued_task() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let queue = DeliveryQueue::new();
        queue.start(
            3,
            counting_send_fn(attempts.clone(), |id, _| DeliveryOutcome::delivered(id)),
        );

        for recipient_id in 1..=25 {
            queue.push(task(recipient_id)).await;
        }
        queue.stop().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 25);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stop_completes_when_last_task_finishes_concurrently() {
        // Workers run on other runtime threads here, so the final
        // pending decrement can land between stop()'s counter check and
        // its first poll of the drain signal. Iterate to give the race
        // a window; a hang shows up as the timeout firing.
        for _ in 0..50 {
            let queue = DeliveryQueue::new();
            queue.start(
                2,
                counting_send_fn(Arc::new(AtomicUsize::new(0)), |id, _| {
                    DeliveryOutcome::delivered(id)
                }),
            );
            queue.push(task(1)).await;
            queue.push(task(2)).await;

            let stopped =
                tokio::time::timeout(Duration::from_secs(10), queue.stop()).await;
            assert!(stopped.is_ok(), "stop() hung on a drained queue");
            assert_eq!(queue.pending(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_on_an_empty_queue_returns_immediately() {
        let queue = DeliveryQueue::new();
        queue.start(2, counting_send_fn(Arc::new(AtomicUsize::new(0)), |id, _| {
            DeliveryOutcome::delivered(id)
        }));
        queue.stop().await;
    }
}
