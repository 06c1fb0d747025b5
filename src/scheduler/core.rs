//! Scheduler implementation

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::stats::{DispatchCounters, SchedulerStats};
use super::task::{ScheduledTask, WorkError};

/// Internal state protected by mutex
struct SchedulerInner {
    /// Priority queue of pending tasks, earliest due first
    queue: BinaryHeap<ScheduledTask>,
}

/// The Scheduler holds tasks until their due time and dispatches each one
/// to asynchronous execution exactly once.
///
/// A single background loop consumes the queue; any number of producers may
/// submit concurrently, before [`start`](Self::start) or after
/// [`stop`](Self::stop) included. Completion state is exposed through
/// lock-free counters.
pub struct Scheduler {
    config: SchedulerConfig,
    inner: Mutex<SchedulerInner>,
    notify: Notify,
    counters: DispatchCounters,
    running: AtomicBool,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self {
            config,
            inner: Mutex::new(SchedulerInner {
                queue: BinaryHeap::new(),
            }),
            notify: Notify::new(),
            counters: DispatchCounters::default(),
            running: AtomicBool::new(false),
        }
    }

    /// Start the dispatch loop on the current tokio runtime
    ///
    /// Fails if the scheduler is already running. A stopped scheduler may be
    /// started again.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        debug!("Scheduler::start: called");
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Scheduler::start: already running, rejecting");
            return Err(SchedulerError::AlreadyRunning);
        }

        let this = Arc::clone(self);
        tokio::spawn(this.dispatch_loop());
        Ok(())
    }

    /// Stop the dispatch loop
    ///
    /// Does not block and does not drain: pending tasks stay queued, and
    /// already-dispatched work still completes and updates the counters.
    /// Idempotent.
    pub fn stop(&self) {
        debug!("Scheduler::stop: called");
        self.running.store(false, Ordering::SeqCst);
        // Wake the loop so it observes the flag instead of sleeping out its wait
        self.notify.notify_one();
    }

    /// Queue a task for dispatch once its due time arrives
    ///
    /// Wakes the dispatch loop if it is parked, so an earlier-due submission
    /// is never delayed by a stale wait.
    pub async fn submit(&self, task: ScheduledTask) {
        debug!(due_at = %task.due_at(), "Scheduler::submit: queuing task");
        let mut inner = self.inner.lock().await;
        inner.queue.push(task);
        drop(inner);

        self.notify.notify_one();
    }

    /// Wrap `work` into a task due at `due_at` and submit it
    pub async fn submit_at(
        &self,
        due_at: DateTime<Utc>,
        work: impl FnOnce() -> Result<(), WorkError> + Send + 'static,
    ) {
        self.submit(ScheduledTask::new(due_at, work)).await;
    }

    /// Number of dispatched tasks that have not yet completed
    pub fn progress_count(&self) -> u64 {
        self.counters.in_flight()
    }

    /// Number of tasks whose work completed without error
    pub fn success_count(&self) -> u64 {
        self.counters.succeeded()
    }

    /// Number of tasks whose work failed
    pub fn error_count(&self) -> u64 {
        self.counters.failed()
    }

    /// Point-in-time snapshot of all three counters
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Select and dispatch the earliest due task, parking until the next
    /// deadline or a new submission in between
    async fn dispatch_loop(self: Arc<Self>) {
        debug!("Scheduler::dispatch_loop: started");
        while self.running.load(Ordering::SeqCst) {
            if let Some(wait) = self.next_wait().await {
                debug!(?wait, "Scheduler::dispatch_loop: parking");
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = tokio::time::sleep(wait) => {}
                }
                continue;
            }

            let Some(task) = self.pop_due().await else {
                // Head changed between the wait computation and the removal
                continue;
            };

            self.counters.dispatched();
            self.spawn_execution(task);
        }
        debug!("Scheduler::dispatch_loop: exited");
    }

    /// How long the loop should park, or None when the head task is due
    ///
    /// An empty queue parks for the configured idle ceiling; a not-yet-due
    /// head parks until its deadline. Both waits are cut short by the next
    /// submit or stop.
    async fn next_wait(&self) -> Option<Duration> {
        let inner = self.inner.lock().await;
        let Some(head) = inner.queue.peek() else {
            return Some(self.config.idle_wait());
        };

        let now = Utc::now();
        if head.is_due(now) {
            return None;
        }
        Some((head.due_at() - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Remove the head task if it is still due
    async fn pop_due(&self) -> Option<ScheduledTask> {
        let mut inner = self.inner.lock().await;
        if inner.queue.peek().is_some_and(|head| head.is_due(Utc::now())) {
            inner.queue.pop()
        } else {
            None
        }
    }

    /// Hand the task's work to the blocking pool and watch its completion
    ///
    /// The loop never joins the work: a watcher task observes the handle and
    /// folds the outcome into the counters. A work error or panic counts as
    /// one failure and nothing else.
    fn spawn_execution(self: &Arc<Self>, task: ScheduledTask) {
        debug!(due_at = %task.due_at(), "Scheduler::spawn_execution: dispatching");
        let handle = tokio::task::spawn_blocking(move || task.invoke());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => this.counters.completed(true),
                Ok(Err(err)) => {
                    debug!(%err, "Scheduler::spawn_execution: work failed");
                    this.counters.completed(false);
                }
                Err(join_err) => {
                    warn!(%join_err, "Scheduler::spawn_execution: work panicked");
                    this.counters.completed(false);
                }
            }
        });
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    async fn wait_settled(scheduler: &Scheduler, total: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if scheduler.progress_count() == 0
                && scheduler.success_count() + scheduler.error_count() >= total
            {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "tasks did not settle in time"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let scheduler = Arc::new(Scheduler::default());

        scheduler.start().expect("first start succeeds");
        assert!(matches!(
            scheduler.start(),
            Err(SchedulerError::AlreadyRunning)
        ));

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let scheduler = Arc::new(Scheduler::default());

        scheduler.start().expect("start succeeds");
        scheduler.stop();
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let scheduler = Arc::new(Scheduler::default());

        scheduler.start().expect("start succeeds");
        scheduler.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        scheduler.start().expect("restart succeeds");
        scheduler.submit_at(Utc::now(), || Ok(())).await;
        wait_settled(&scheduler, 1).await;
        assert_eq!(scheduler.success_count(), 1);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_due_task_runs() {
        let scheduler = Arc::new(Scheduler::default());
        scheduler.start().expect("start succeeds");

        scheduler.submit_at(Utc::now(), || Ok(())).await;

        wait_settled(&scheduler, 1).await;
        assert_eq!(scheduler.success_count(), 1);
        assert_eq!(scheduler.error_count(), 0);
        assert_eq!(scheduler.progress_count(), 0);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_submit_before_start() {
        let scheduler = Arc::new(Scheduler::default());

        scheduler.submit_at(Utc::now(), || Ok(())).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.success_count(), 0);

        scheduler.start().expect("start succeeds");
        wait_settled(&scheduler, 1).await;
        assert_eq!(scheduler.success_count(), 1);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_failing_task_counts_error() {
        let scheduler = Arc::new(Scheduler::default());
        scheduler.start().expect("start succeeds");

        scheduler.submit_at(Utc::now(), || Err("boom".into())).await;

        wait_settled(&scheduler, 1).await;
        assert_eq!(scheduler.error_count(), 1);
        assert_eq!(scheduler.success_count(), 0);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_panicking_task_counts_error() {
        let scheduler = Arc::new(Scheduler::default());
        scheduler.start().expect("start succeeds");

        scheduler.submit_at(Utc::now(), || panic!("work blew up")).await;
        // The loop survives and keeps dispatching
        scheduler.submit_at(Utc::now(), || Ok(())).await;

        wait_settled(&scheduler, 2).await;
        assert_eq!(scheduler.error_count(), 1);
        assert_eq!(scheduler.success_count(), 1);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_future_task_not_run_early() {
        let scheduler = Arc::new(Scheduler::default());
        scheduler.start().expect("start succeeds");

        scheduler
            .submit_at(Utc::now() + ChronoDuration::seconds(5), || Ok(()))
            .await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(scheduler.stats(), SchedulerStats::default());

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let scheduler = Arc::new(Scheduler::default());
        scheduler.start().expect("start succeeds");

        scheduler.submit_at(Utc::now(), || Ok(())).await;
        scheduler.submit_at(Utc::now(), || Err("boom".into())).await;

        wait_settled(&scheduler, 2).await;
        let stats = scheduler.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);

        scheduler.stop();
    }
}
