//! Upload scheduler: admits queued jobs in FIFO order into at most
//! `max_concurrent` worker tasks.
//!
//! Every change to the queue, the job table and the active count happens
//! under one mutex, so `active <= max_concurrent` holds no matter how many
//! workers finish at once. Worker tasks are spawned after the lock is
//! released; a slot is reserved for them before that.

mod guard;
mod state;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

pub use state::{FinishedCounts, SchedulerSnapshot};

use self::guard::SlotGuard;
use self::state::{Admission, Load, SchedulerState};
use crate::connectivity::ConnectivityProbe;
use crate::events::{self, emit, EventReceiver, EventSender, UploadEvent};
use crate::executor::TransferExecutor;
use crate::job::{Job, JobId, JobState, RemoteTarget, SubmitError, TerminalOutcome};
use crate::retry::RetryPolicy;
use crate::scan::ScanSummary;
use crate::worker::UploadWorker;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Maximum number of transfers running at once (at least 1).
    pub max_concurrent: usize,
    pub retry: RetryPolicy,
    /// How long cancel-all waits for workers before aborting them.
    pub cancel_grace: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            retry: RetryPolicy::default(),
            cancel_grace: Duration::from_secs(10),
        }
    }
}

struct Shared {
    state: Mutex<SchedulerState>,
    settings: SchedulerSettings,
    executor: Arc<dyn TransferExecutor>,
    probe: Arc<dyn ConnectivityProbe>,
    events: EventSender,
    load: watch::Sender<Load>,
    runtime: Handle,
}

/// Cheap to clone; all clones drive the same queue.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler and the receiver for its events.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; workers are spawned on the
    /// runtime that was current here.
    pub fn new(
        settings: SchedulerSettings,
        executor: Arc<dyn TransferExecutor>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> (Self, EventReceiver) {
        let (events, rx) = events::channel();
        let (load, _) = watch::channel(Load::default());
        let settings = SchedulerSettings {
            max_concurrent: settings.max_concurrent.max(1),
            ..settings
        };
        let shared = Arc::new(Shared {
            state: Mutex::new(SchedulerState::default()),
            settings,
            executor,
            probe,
            events,
            load,
            runtime: Handle::current(),
        });
        (Self { shared }, rx)
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.shared.settings
    }

    /// Build a job for `source` and enqueue it.
    pub fn submit(
        &self,
        source: impl AsRef<Path>,
        target: RemoteTarget,
    ) -> Result<JobId, SubmitError> {
        self.submit_scanned(source, target, None)
    }

    /// Like [`Scheduler::submit`], attaching the result of a pre-upload scan.
    pub fn submit_scanned(
        &self,
        source: impl AsRef<Path>,
        target: RemoteTarget,
        scan: Option<ScanSummary>,
    ) -> Result<JobId, SubmitError> {
        let mut job = Job::new(source, target)?;
        job.scan = scan;
        let id = job.id.clone();
        self.enqueue(job)?;
        Ok(id)
    }

    /// Append `job` to the queue and start it if a slot is free.
    ///
    /// Rejects a job whose id is already queued or running.
    pub fn enqueue(&self, job: Job) -> Result<(), SubmitError> {
        let admissions = {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            if state.jobs.contains_key(&job.id) {
                tracing::debug!(job_id = %job.id, "duplicate submission rejected");
                return Err(SubmitError::Duplicate(job.id));
            }
            tracing::info!(
                job_id = %job.id,
                destination = %job.destination_url(),
                "job queued"
            );
            let entry = state.new_entry();
            state.jobs.insert(job.id.clone(), entry);
            emit(
                &self.shared.events,
                UploadEvent::Queued {
                    job_id: job.id.clone(),
                },
            );
            state.queue.push_back(job);
            let admissions = self.shared.admit_next(state);
            self.shared.publish_load(state);
            admissions
        };
        self.shared.start(admissions);
        Ok(())
    }

    /// Cancel one job.
    ///
    /// A queued job is dropped from the queue and reported `Canceled` right
    /// away. A running job has its cancel signal raised; the worker stops its
    /// transfer and reports. Returns `false` when the id is unknown, already
    /// terminal, or already being cancelled.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let Some(job_state) = state.jobs.get(job_id).map(|e| e.state) else {
            return false;
        };

        if job_state == JobState::Queued {
            state.queue.retain(|j| &j.id != job_id);
            state.jobs.remove(job_id);
            state.finished.record(JobState::Canceled);
            tracing::info!(job_id = %job_id, "queued job canceled");
            emit(
                &self.shared.events,
                UploadEvent::Terminal {
                    job_id: job_id.clone(),
                    outcome: TerminalOutcome::Canceled,
                },
            );
            self.shared.publish_load(state);
            return true;
        }

        let Some(entry) = state.jobs.get(job_id) else {
            return false;
        };
        if entry.cancel.is_cancelled() {
            return false;
        }
        tracing::info!(job_id = %job_id, "cancel requested");
        entry.cancel.cancel();
        true
    }

    /// Discard the queue, cancel every running job and wait for the workers.
    ///
    /// Workers still running after `cancel_grace` are aborted. When this
    /// returns no slot is occupied and the finished counters are reset.
    pub async fn cancel_all(&self) {
        {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            let discarded: Vec<Job> = state.queue.drain(..).collect();
            for job in &discarded {
                state.jobs.remove(&job.id);
                emit(
                    &self.shared.events,
                    UploadEvent::Terminal {
                        job_id: job.id.clone(),
                        outcome: TerminalOutcome::Canceled,
                    },
                );
            }
            for entry in state.jobs.values() {
                entry.cancel.cancel();
            }
            tracing::info!(
                discarded = discarded.len(),
                running = state.active,
                "cancel-all requested"
            );
            self.shared.publish_load(state);
        }

        let grace = self.shared.settings.cancel_grace;
        let mut load = self.shared.load.subscribe();
        let drained = tokio::time::timeout(grace, load.wait_for(|l| l.active == 0))
            .await
            .is_ok();
        if !drained {
            let stragglers: Vec<_> = {
                let mut state = self.shared.lock();
                state
                    .jobs
                    .iter_mut()
                    .filter(|(_, e)| e.cancel.is_cancelled())
                    .filter_map(|(id, e)| e.handle.take().map(|h| (id.clone(), h)))
                    .collect()
            };
            for (job_id, handle) in stragglers {
                tracing::warn!(job_id = %job_id, ?grace, "worker did not stop in time, aborting");
                handle.abort();
                // Dropping the aborted task's slot guard reports the job.
                let _ = handle.await;
            }
        }

        let mut state = self.shared.lock();
        state.finished = FinishedCounts::default();
        tracing::info!(active = state.active, "cancel-all complete");
    }

    /// Resolves once the queue is empty and no job is running.
    pub async fn wait_idle(&self) {
        let mut load = self.shared.load.subscribe();
        // The sender lives in `shared`, which `self` keeps alive.
        let _ = load.wait_for(|l| l.queued == 0 && l.active == 0).await;
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn active_count(&self) -> usize {
        self.shared.lock().active
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // Bookkeeping stays consistent across a panicking holder; keep going.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_load(&self, state: &SchedulerState) {
        self.load.send_replace(state.load());
    }

    /// Move queue heads into free slots. Caller holds the lock and must pass
    /// the result to [`Shared::start`] after releasing it.
    fn admit_next(&self, state: &mut SchedulerState) -> Vec<Admission> {
        let mut admissions = Vec::new();
        while state.active < self.settings.max_concurrent {
            let Some(job) = state.queue.pop_front() else {
                break;
            };
            let Some(entry) = state.jobs.get_mut(&job.id) else {
                continue;
            };
            entry.state = JobState::Running;
            let admission = Admission {
                serial: entry.serial,
                cancel: entry.cancel.clone(),
                job,
            };
            state.active += 1;
            let scan = admission.job.scan.unwrap_or_default();
            tracing::info!(
                job_id = %admission.job.id,
                active = state.active,
                max = self.settings.max_concurrent,
                files = scan.files,
                bytes = scan.bytes,
                "job admitted"
            );
            admissions.push(admission);
        }
        admissions
    }

    fn start(self: &Arc<Self>, admissions: Vec<Admission>) {
        for Admission { job, serial, cancel } in admissions {
            let job_id = job.id.clone();
            let worker = UploadWorker::new(
                job,
                Arc::clone(&self.executor),
                Arc::clone(&self.probe),
                self.settings.retry,
                self.events.clone(),
                cancel,
            );
            let phase = worker.state_watch();
            let slot = SlotGuard::new(Arc::clone(self), job_id.clone(), serial);
            let handle = self.runtime.spawn(async move {
                let result = worker.run().await;
                slot.complete(result);
            });

            let mut state = self.lock();
            if let Some(entry) = state.jobs.get_mut(&job_id) {
                if entry.serial == serial {
                    entry.handle = Some(handle);
                    entry.phase = Some(phase);
                }
            }
        }
    }

    fn is_cancel_requested(&self, job_id: &JobId) -> bool {
        self.lock()
            .jobs
            .get(job_id)
            .is_some_and(|e| e.cancel.is_cancelled())
    }

    /// Called exactly once per admitted job, from its slot guard.
    fn on_job_terminal(
        self: &Arc<Self>,
        job_id: &JobId,
        serial: u64,
        outcome: TerminalOutcome,
        attempts: u32,
    ) {
        let admissions = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let cancel_requested = match state.jobs.get(job_id) {
                Some(entry) if entry.serial == serial => entry.cancel.is_cancelled(),
                _ => return,
            };
            state.jobs.remove(job_id);
            // A job whose cancel was accepted never ends Succeeded.
            let outcome = match outcome {
                TerminalOutcome::Succeeded if cancel_requested => {
                    tracing::debug!(job_id = %job_id, "success reported after cancel request");
                    TerminalOutcome::Canceled
                }
                other => other,
            };
            state.active = state.active.saturating_sub(1);
            state.finished.record(outcome.state());
            match &outcome {
                TerminalOutcome::Failed { error } => {
                    tracing::warn!(job_id = %job_id, attempts, error = %error, "job failed")
                }
                _ => tracing::info!(
                    job_id = %job_id,
                    attempts,
                    state = outcome.state().as_str(),
                    "job finished"
                ),
            }
            emit(
                &self.events,
                UploadEvent::Terminal {
                    job_id: job_id.clone(),
                    outcome,
                },
            );
            let admissions = self.admit_next(state);
            self.publish_load(state);
            admissions
        };
        self.start(admissions);
    }
}
