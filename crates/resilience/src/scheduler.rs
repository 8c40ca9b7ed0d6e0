//! Deadline-ordered retry scheduler.
//!
//! [`RetryScheduler`] is the producer handle: `schedule` pushes a task onto
//! an unbounded channel and returns at once. [`RetryWorker`] owns a min-heap
//! of pending tasks keyed by their not-before instant and sleeps until the
//! earliest one is due. A replay that errors or answers with a 5xx status is
//! pushed back with a fresh deadline; nothing bounds the number of attempts.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{ReplayError, SchedulerError};
use crate::snapshot::RequestSnapshot;

/// Default wait before a failed request is replayed.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub cooldown: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Processes a captured request again.
#[async_trait]
pub trait ReplayHandler: Send + Sync {
    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Replays the request and reports the status it would have answered.
    async fn replay(&self, request: &RequestSnapshot) -> Result<StatusCode, ReplayError>;
}

/// A request waiting to be replayed.
#[derive(Clone)]
pub struct RetryTask {
    pub handler: Arc<dyn ReplayHandler>,
    pub request: RequestSnapshot,
    pub not_before: Instant,
}

impl RetryTask {
    /// Creates a task that may run at `not_before` at the earliest.
    pub fn new(
        handler: Arc<dyn ReplayHandler>,
        request: RequestSnapshot,
        not_before: Instant,
    ) -> Self {
        Self {
            handler,
            request,
            not_before,
        }
    }
}

impl std::fmt::Debug for RetryTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTask")
            .field("handler", &self.handler.name())
            .field("request", &self.request)
            .field("not_before", &self.not_before)
            .finish()
    }
}

/// Heap entry; ties on the deadline fall back to arrival order.
struct Queued {
    seq: u64,
    task: RetryTask,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.task
            .not_before
            .cmp(&other.task.not_before)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Handle for enqueueing retry tasks. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    sender: mpsc::UnboundedSender<RetryTask>,
    pending: Arc<AtomicUsize>,
    config: RetryConfig,
}

impl RetryScheduler {
    /// Creates a scheduler handle and the worker that drains it.
    ///
    /// Nothing is replayed until [`RetryWorker::spawn`] (or `run`) is called.
    pub fn new(config: RetryConfig) -> (Self, RetryWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let scheduler = Self {
            sender,
            pending: Arc::clone(&pending),
            config,
        };
        let worker = RetryWorker {
            receiver,
            queue: BinaryHeap::new(),
            pending,
            config,
            next_seq: 0,
        };
        (scheduler, worker)
    }

    /// Returns the scheduler settings.
    pub fn config(&self) -> RetryConfig {
        self.config
    }

    /// Enqueues a task without waiting for it to run.
    pub fn schedule(&self, task: RetryTask) -> Result<(), SchedulerError> {
        let handler = task.handler.name();
        self.pending.fetch_add(1, AtomicOrdering::SeqCst);
        if self.sender.send(task).is_err() {
            self.pending.fetch_sub(1, AtomicOrdering::SeqCst);
            return Err(SchedulerError::Closed);
        }
        metrics::counter!("retry_tasks_scheduled_total", "handler" => handler).increment(1);
        tracing::info!(
            handler,
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            "retry scheduled"
        );
        Ok(())
    }

    /// Enqueues `request` for replay by `handler` once the cooldown has passed.
    pub fn schedule_after_cooldown(
        &self,
        handler: Arc<dyn ReplayHandler>,
        request: RequestSnapshot,
    ) -> Result<(), SchedulerError> {
        let not_before = Instant::now() + self.config.cooldown;
        self.schedule(RetryTask::new(handler, request, not_before))
    }

    /// Returns the number of tasks scheduled and not yet replayed successfully.
    pub fn pending(&self) -> usize {
        self.pending.load(AtomicOrdering::SeqCst)
    }
}

/// Background side of the scheduler. Replays due tasks one at a time.
pub struct RetryWorker {
    receiver: mpsc::UnboundedReceiver<RetryTask>,
    queue: BinaryHeap<Reverse<Queued>>,
    pending: Arc<AtomicUsize>,
    config: RetryConfig,
    next_seq: u64,
}

impl RetryWorker {
    /// Runs the worker on its own tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until every [`RetryScheduler`] handle has been dropped.
    ///
    /// Tasks still queued at that point are discarded.
    pub async fn run(mut self) {
        loop {
            let next_deadline = self.queue.peek().map(|Reverse(queued)| queued.task.not_before);

            tokio::select! {
                received = self.receiver.recv() => match received {
                    Some(task) => self.enqueue(task),
                    None => {
                        if !self.queue.is_empty() {
                            tracing::warn!(
                                dropped = self.queue.len(),
                                "retry worker stopping with queued tasks"
                            );
                        }
                        return;
                    }
                },
                _ = tokio::time::sleep_until(next_deadline.unwrap_or_else(Instant::now)),
                    if next_deadline.is_some() =>
                {
                    self.replay_due().await;
                }
            }
        }
    }

    fn enqueue(&mut self, task: RetryTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Queued { seq, task }));
    }

    /// Replays the tasks that were due when the pass started.
    ///
    /// Tasks rescheduled during the pass wait for the next turn of `run`.
    async fn replay_due(&mut self) {
        let now = Instant::now();
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(queued)| queued.task.not_before <= now)
        {
            if let Some(Reverse(queued)) = self.queue.pop() {
                due.push(queued.task);
            }
        }
        for task in due {
            self.replay(task).await;
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(handler = task.handler.name(), attempt = task.request.attempt + 1)
    )]
    async fn replay(&mut self, mut task: RetryTask) {
        let handler = task.handler.name();
        task.request.attempt += 1;

        let failure = match task.handler.replay(&task.request).await {
            Ok(status) if !status.is_server_error() => {
                metrics::counter!(
                    "retry_replays_total",
                    "handler" => handler,
                    "outcome" => "completed"
                )
                .increment(1);
                self.pending.fetch_sub(1, AtomicOrdering::SeqCst);
                tracing::info!(%status, "replay completed");
                return;
            }
            Ok(status) => status.to_string(),
            Err(e) => e.to_string(),
        };

        metrics::counter!(
            "retry_replays_total",
            "handler" => handler,
            "outcome" => "rescheduled"
        )
        .increment(1);
        tracing::warn!(reason = %failure, "replay failed, rescheduling");
        task.not_before = Instant::now() + self.config.cooldown;
        self.enqueue(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers with scripted statuses, then 200 forever.
    struct Scripted {
        script: Mutex<Vec<Result<StatusCode, ()>>>,
        seen: Mutex<Vec<(u32, Instant)>>,
    }

    impl Scripted {
        fn new(mut script: Vec<Result<StatusCode, ()>>) -> Arc<Self> {
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> Vec<u32> {
            self.seen.lock().unwrap().iter().map(|(a, _)| *a).collect()
        }
    }

    #[async_trait]
    impl ReplayHandler for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn replay(&self, request: &RequestSnapshot) -> Result<StatusCode, ReplayError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.attempt, Instant::now()));
            match self.script.lock().unwrap().pop() {
                Some(Ok(status)) => Ok(status),
                Some(Err(())) => Err(ReplayError::new("scripted", "connection refused")),
                None => Ok(StatusCode::OK),
            }
        }
    }

    fn snapshot() -> RequestSnapshot {
        RequestSnapshot::new("POST", "/api/v1/reservations", "max")
    }

    fn start(cooldown: Duration) -> RetryScheduler {
        let (scheduler, worker) = RetryScheduler::new(RetryConfig { cooldown });
        worker.spawn();
        scheduler
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_replayed_before_deadline() {
        let scheduler = start(Duration::from_secs(2));
        let handler = Scripted::new(vec![]);
        let started = Instant::now();

        scheduler
            .schedule_after_cooldown(handler.clone(), snapshot())
            .unwrap();
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(handler.attempts().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(handler.attempts(), vec![1]);
        let (_, at) = handler.seen.lock().unwrap()[0];
        assert!(at - started >= Duration::from_secs(2));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_rescheduled_until_success() {
        let scheduler = start(Duration::from_secs(2));
        let handler = Scripted::new(vec![
            Err(()),
            Ok(StatusCode::SERVICE_UNAVAILABLE),
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
        ]);

        scheduler
            .schedule_after_cooldown(handler.clone(), snapshot())
            .unwrap();

        tokio::time::sleep(Duration::from_millis(6001)).await;
        assert_eq!(handler.attempts(), vec![1, 2, 3]);
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handler.attempts(), vec![1, 2, 3, 4]);
        assert_eq!(scheduler.pending(), 0);

        let seen = handler.seen.lock().unwrap();
        for pair in seen.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_rescheduled() {
        let scheduler = start(Duration::from_secs(2));
        let handler = Scripted::new(vec![Ok(StatusCode::BAD_REQUEST)]);

        scheduler
            .schedule_after_cooldown(handler.clone(), snapshot())
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(handler.attempts(), vec![1]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_deadline_runs_first() {
        let scheduler = start(Duration::from_secs(2));
        let late = Scripted::new(vec![]);
        let early = Scripted::new(vec![]);
        let now = Instant::now();

        scheduler
            .schedule(RetryTask::new(late.clone(), snapshot(), now + Duration::from_secs(5)))
            .unwrap();
        scheduler
            .schedule(RetryTask::new(early.clone(), snapshot(), now + Duration::from_secs(1)))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(early.attempts(), vec![1]);
        assert!(late.attempts().is_empty());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(late.attempts(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_cooldown_retries_once_per_pass() {
        let scheduler = start(Duration::ZERO);
        let failing = Scripted::new(vec![
            Ok(StatusCode::SERVICE_UNAVAILABLE),
            Ok(StatusCode::SERVICE_UNAVAILABLE),
            Ok(StatusCode::SERVICE_UNAVAILABLE),
        ]);
        let other = Scripted::new(vec![]);

        scheduler
            .schedule_after_cooldown(failing.clone(), snapshot())
            .unwrap();
        scheduler
            .schedule_after_cooldown(other.clone(), snapshot())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(failing.attempts(), vec![1, 2, 3, 4]);
        assert_eq!(other.attempts(), vec![1]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_schedule_fails_once_worker_is_gone() {
        let (scheduler, worker) = RetryScheduler::new(RetryConfig::default());
        drop(worker);

        let err = scheduler
            .schedule_after_cooldown(Scripted::new(vec![]), snapshot())
            .unwrap_err();
        assert_eq!(err, SchedulerError::Closed);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_when_handles_dropped() {
        let (scheduler, worker) = RetryScheduler::new(RetryConfig::default());
        let handle = worker.spawn();
        drop(scheduler);
        handle.await.unwrap();
    }
}
