//! Scheduler bookkeeping: the FIFO queue, live jobs and the active-slot count.
//! Only ever touched with the scheduler mutex held.

use std::collections::{HashMap, VecDeque};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::job::{Job, JobId, JobState};

/// A queued or running job.
pub(super) struct JobEntry {
    pub(super) state: JobState,
    pub(super) cancel: CancellationToken,
    /// Identifies this submission; a later job with the same id gets a new serial.
    pub(super) serial: u64,
    /// Worker task, present while running and not yet claimed by cancel-all.
    pub(super) handle: Option<JoinHandle<()>>,
    /// The worker's own view of its state (`Running` or `Retrying`).
    pub(super) phase: Option<watch::Receiver<JobState>>,
}

impl JobEntry {
    /// Lifecycle state as seen from outside: the worker's state once it has one.
    pub(super) fn current_state(&self) -> JobState {
        match &self.phase {
            Some(phase) => *phase.borrow(),
            None => self.state,
        }
    }
}

/// A job taken off the queue under the lock, to be spawned after it is released.
pub(super) struct Admission {
    pub(super) job: Job,
    pub(super) serial: u64,
    pub(super) cancel: CancellationToken,
}

/// Queue length and occupied slots, published after every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct Load {
    pub(super) queued: usize,
    pub(super) active: usize,
}

/// Counts of finished jobs since the last cancel-all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishedCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
}

impl FinishedCounts {
    pub(super) fn record(&mut self, state: JobState) {
        match state {
            JobState::Succeeded => self.succeeded += 1,
            JobState::Failed => self.failed += 1,
            JobState::Canceled => self.canceled += 1,
            _ => {}
        }
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// Queued job ids in admission order.
    pub queued: Vec<JobId>,
    /// Number of occupied worker slots.
    pub active: usize,
    /// Admitted jobs by id with their state (`Running` or `Retrying`).
    pub running: Vec<(JobId, JobState)>,
    pub finished: FinishedCounts,
}

#[derive(Default)]
pub(super) struct SchedulerState {
    pub(super) queue: VecDeque<Job>,
    /// Queued and running jobs by id.
    pub(super) jobs: HashMap<JobId, JobEntry>,
    pub(super) active: usize,
    pub(super) finished: FinishedCounts,
    next_serial: u64,
}

impl SchedulerState {
    pub(super) fn new_entry(&mut self) -> JobEntry {
        self.next_serial += 1;
        JobEntry {
            state: JobState::Queued,
            cancel: CancellationToken::new(),
            serial: self.next_serial,
            handle: None,
            phase: None,
        }
    }

    pub(super) fn load(&self) -> Load {
        Load {
            queued: self.queue.len(),
            active: self.active,
        }
    }

    pub(super) fn snapshot(&self) -> SchedulerSnapshot {
        let mut running: Vec<_> = self
            .jobs
            .iter()
            .filter(|(_, e)| e.state != JobState::Queued)
            .map(|(id, e)| (id.clone(), e.current_state()))
            .collect();
        running.sort_by(|a, b| a.0.cmp(&b.0));
        SchedulerSnapshot {
            queued: self.queue.iter().map(|j| j.id.clone()).collect(),
            active: self.active,
            running,
            finished: self.finished,
        }
    }
}
