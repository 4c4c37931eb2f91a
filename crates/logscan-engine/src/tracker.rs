//! Job tracker: polls a processing job until it reaches a terminal status.
//!
//! A [`JobTracker`] owns at most one polling loop. [`JobTracker::start`]
//! tears down any previous loop before spawning the new one, so switching jobs
//! never leaves two loops running.
//!
//! The loop polls immediately, then once per interval. Each successful poll
//! replaces the job's telemetry wholesale and emits [`TrackerEvent::Update`];
//! the first terminal status additionally emits [`TrackerEvent::Terminal`] and
//! ends the loop. Failed polls (transport errors and `success: false` alike)
//! bump a failure counter and polling carries on at the same pace.

use logscan_client::LogService;
use logscan_core::{Job, JobHandle, JobStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Notifications emitted by a [`JobTracker`]. Each carries an owned snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A poll succeeded.
    Update(Job),
    /// The job reached COMPLETED, FAILED or CANCELLED. Sent once per `start`.
    Terminal(Job),
}

impl TrackerEvent {
    pub fn job(&self) -> &Job {
        match self {
            TrackerEvent::Update(job) | TrackerEvent::Terminal(job) => job,
        }
    }
}

struct ActivePoll {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// State shared between the tracker and its polling task.
struct PollContext {
    service: Arc<dyn LogService>,
    interval: Duration,
    events: mpsc::UnboundedSender<TrackerEvent>,
    snapshot: Arc<watch::Sender<Option<Job>>>,
    failures: Arc<AtomicU64>,
    generation: Arc<Mutex<u64>>,
    /// Generation this loop was started under.
    owner: u64,
    cancel: CancellationToken,
}

impl PollContext {
    /// Run `publish` only if this loop still owns the tracker.
    ///
    /// The generation lock is held while `publish` runs and `stop` takes the
    /// same lock, so nothing from this loop is observable once `stop` returns.
    fn publish(&self, publish: impl FnOnce()) -> bool {
        let generation = lock(&self.generation);
        if self.cancel.is_cancelled() || *generation != self.owner {
            return false;
        }
        publish();
        true
    }
}

fn lock(generation: &Mutex<u64>) -> MutexGuard<'_, u64> {
    generation.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct JobTracker {
    service: Arc<dyn LogService>,
    interval: Duration,
    events: mpsc::UnboundedSender<TrackerEvent>,
    snapshot: Arc<watch::Sender<Option<Job>>>,
    failures: Arc<AtomicU64>,
    generation: Arc<Mutex<u64>>,
    active: Option<ActivePoll>,
}

impl JobTracker {
    pub fn new(
        service: Arc<dyn LogService>,
        interval: Duration,
        events: mpsc::UnboundedSender<TrackerEvent>,
    ) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            service,
            interval,
            events,
            snapshot: Arc::new(snapshot),
            failures: Arc::new(AtomicU64::new(0)),
            generation: Arc::new(Mutex::new(0)),
            active: None,
        }
    }

    /// Begin tracking `handle`, replacing whatever was tracked before.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, handle: &JobHandle) {
        self.stop();

        let job = Job::from_handle(handle);
        self.failures.store(0, Ordering::SeqCst);
        self.snapshot.send_replace(Some(job.clone()));

        let cancel = CancellationToken::new();
        let ctx = PollContext {
            service: Arc::clone(&self.service),
            interval: self.interval,
            events: self.events.clone(),
            snapshot: Arc::clone(&self.snapshot),
            failures: Arc::clone(&self.failures),
            generation: Arc::clone(&self.generation),
            owner: *lock(&self.generation),
            cancel: cancel.clone(),
        };

        tracing::info!(job_id = %job.job_id, interval_ms = self.interval.as_millis() as u64, "tracking job");
        let task = tokio::spawn(poll_loop(ctx, job));
        self.active = Some(ActivePoll { cancel, task });
    }

    /// Halt polling. Responses still in flight are discarded.
    pub fn stop(&mut self) {
        *lock(&self.generation) += 1;
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.task.abort();
            tracing::debug!("polling stopped");
        }
    }

    /// Stop polling and forget the job (the user closed its card).
    pub fn dismiss(&mut self) {
        self.stop();
        self.snapshot.send_replace(None);
    }

    /// True while a polling loop is running.
    pub fn is_polling(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Consecutive failed polls since the last success.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Latest snapshot of the tracked job.
    pub fn current(&self) -> Option<Job> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Job>> {
        self.snapshot.subscribe()
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(ctx: PollContext, mut job: Job) {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            result = ctx.service.job_status(&job.job_id) => result,
        };

        match result {
            Ok(report) => {
                let mut next = job.clone();
                next.apply(report);
                let terminal = next.is_terminal();
                let published = ctx.publish(|| {
                    ctx.failures.store(0, Ordering::SeqCst);
                    ctx.snapshot.send_replace(Some(next.clone()));
                    let _ = ctx.events.send(TrackerEvent::Update(next.clone()));
                    if terminal {
                        let _ = ctx.events.send(TrackerEvent::Terminal(next.clone()));
                    }
                });
                if !published {
                    tracing::debug!(job_id = %job.job_id, "discarding status for superseded job");
                    break;
                }

                job = next;
                tracing::debug!(
                    job_id = %job.job_id,
                    status = %job.status(),
                    progress = job.progress(),
                    "job status"
                );
                if terminal {
                    log_terminal(&job);
                    break;
                }
            }
            Err(e) => {
                let mut failures = 0;
                let counted = ctx.publish(|| {
                    failures = ctx.failures.fetch_add(1, Ordering::SeqCst) + 1;
                });
                if !counted {
                    break;
                }
                tracing::warn!(job_id = %job.job_id, failures, error = %e, "status poll failed");
            }
        }
    }
}

fn log_terminal(job: &Job) {
    let detail = job.detail().unwrap_or_default();
    match job.status() {
        JobStatus::Completed => {
            tracing::info!(job_id = %job.job_id, detail, "processing completed")
        }
        status => {
            tracing::error!(job_id = %job.job_id, %status, detail, "processing failed")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
