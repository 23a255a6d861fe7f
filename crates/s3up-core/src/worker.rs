//! Upload worker: drives one job through connectivity checks, transfer
//! attempts, progress streaming and retry backoff until it succeeds, fails
//! for good, or is cancelled.
//!
//! The worker never reports the terminal state itself; it returns a
//! [`TerminalResult`] and the scheduler turns that into the one `Terminal`
//! event for the job.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::connectivity::ConnectivityProbe;
use crate::events::{emit, EventSender, UploadEvent, WaitReason};
use crate::executor::TransferExecutor;
use crate::job::{Job, JobState, TerminalOutcome};
use crate::progress;
use crate::retry::{self, ErrorKind, RetryDecision, RetryPolicy, TransferError};

/// Final result of a worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalResult {
    pub outcome: TerminalOutcome,
    /// Attempts consumed, including ones skipped because the network was down.
    pub attempts: u32,
}

enum Attempt {
    Succeeded,
    Canceled,
    Failed(TransferError),
}

enum Backoff {
    Retry,
    GiveUp,
    Canceled,
}

pub struct UploadWorker {
    job: Job,
    executor: Arc<dyn TransferExecutor>,
    probe: Arc<dyn ConnectivityProbe>,
    policy: RetryPolicy,
    events: EventSender,
    cancel: CancellationToken,
    state: watch::Sender<JobState>,
}

impl UploadWorker {
    pub fn new(
        job: Job,
        executor: Arc<dyn TransferExecutor>,
        probe: Arc<dyn ConnectivityProbe>,
        policy: RetryPolicy,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            executor,
            probe,
            policy,
            events,
            cancel,
            state: watch::channel(JobState::Running).0,
        }
    }

    /// Follows the job's lifecycle state (`Running`, `Retrying`, then terminal)
    /// while the worker runs.
    pub fn state_watch(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    fn set_state(&mut self, next: JobState) {
        let current = *self.state.borrow();
        if current == next {
            return;
        }
        debug_assert!(
            current.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            current,
            next
        );
        tracing::debug!(job_id = %self.job.id, from = current.as_str(), to = next.as_str(), "job state");
        self.state.send_replace(next);
    }

    fn finish(&mut self, outcome: TerminalOutcome, attempts: u32) -> TerminalResult {
        self.set_state(outcome.state());
        TerminalResult { outcome, attempts }
    }

    fn canceled(&mut self, attempts: u32) -> TerminalResult {
        tracing::info!(job_id = %self.job.id, attempts, "upload canceled");
        self.finish(TerminalOutcome::Canceled, attempts)
    }

    /// Runs the job to a terminal state.
    pub async fn run(mut self) -> TerminalResult {
        let mut attempt = 0u32;
        let mut last_error = String::new();

        loop {
            if self.cancel.is_cancelled() {
                return self.canceled(attempt);
            }

            let reachable = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.canceled(attempt),
                reachable = self.probe.is_reachable() => reachable,
            };
            if !reachable {
                attempt += 1;
                last_error = "network unreachable".to_string();
                tracing::warn!(job_id = %self.job.id, attempt, "network unreachable, attempt skipped");
                emit(
                    &self.events,
                    UploadEvent::Waiting {
                        job_id: self.job.id.clone(),
                        attempt,
                        reason: WaitReason::Offline,
                    },
                );
                match self.backoff(attempt, ErrorKind::Offline, None).await {
                    Backoff::Retry => continue,
                    Backoff::GiveUp => break,
                    Backoff::Canceled => return self.canceled(attempt),
                }
            }

            attempt += 1;
            self.set_state(JobState::Running);
            emit(
                &self.events,
                UploadEvent::Started {
                    job_id: self.job.id.clone(),
                    attempt,
                },
            );
            tracing::info!(job_id = %self.job.id, attempt, destination = %self.job.destination_url(), "upload attempt started");

            match self.attempt().await {
                Attempt::Succeeded => {
                    tracing::info!(job_id = %self.job.id, attempt, "upload succeeded");
                    return self.finish(TerminalOutcome::Succeeded, attempt);
                }
                Attempt::Canceled => return self.canceled(attempt),
                Attempt::Failed(e) => {
                    let kind = retry::classify(&e);
                    last_error = e.to_string();
                    tracing::warn!(job_id = %self.job.id, attempt, "upload attempt failed: {}", last_error);
                    let reason = WaitReason::Retrying {
                        error: last_error.clone(),
                    };
                    match self.backoff(attempt, kind, Some(reason)).await {
                        Backoff::Retry => {}
                        Backoff::GiveUp => break,
                        Backoff::Canceled => return self.canceled(attempt),
                    }
                }
            }
        }

        if self.cancel.is_cancelled() {
            return self.canceled(attempt);
        }
        tracing::warn!(job_id = %self.job.id, attempts = attempt, "upload failed: {}", last_error);
        self.finish(TerminalOutcome::Failed { error: last_error }, attempt)
    }

    /// Applies the retry policy after a failed or skipped attempt. When a retry
    /// follows, `reason` (if any) is reported before the backoff starts.
    async fn backoff(&mut self, attempt: u32, kind: ErrorKind, reason: Option<WaitReason>) -> Backoff {
        let delay = match self.policy.decide(attempt, kind) {
            RetryDecision::NoRetry => return Backoff::GiveUp,
            RetryDecision::RetryAfter(delay) => delay,
        };
        self.set_state(JobState::Retrying);
        if let Some(reason) = reason {
            emit(
                &self.events,
                UploadEvent::Waiting {
                    job_id: self.job.id.clone(),
                    attempt,
                    reason,
                },
            );
        }
        tracing::debug!(job_id = %self.job.id, attempt, delay_ms = delay.as_millis() as u64, "backing off");
        if retry::wait_backoff(delay, &self.cancel).await {
            Backoff::Retry
        } else {
            Backoff::Canceled
        }
    }

    /// One invocation of the transfer executor, streaming its output.
    async fn attempt(&self) -> Attempt {
        let started = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Attempt::Canceled,
            started = self.executor.start(&self.job) => started,
        };
        let mut process = match started {
            Ok(p) => p,
            Err(e) => return Attempt::Failed(e),
        };

        loop {
            let line = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    process.terminate().await;
                    return Attempt::Canceled;
                }
                line = process.next_line() => line,
            };
            match line {
                Ok(Some(line)) => self.observe_line(&line),
                Ok(None) => break,
                Err(e) => {
                    process.terminate().await;
                    return Attempt::Failed(TransferError::Io(e));
                }
            }
        }

        let exit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                process.terminate().await;
                return Attempt::Canceled;
            }
            exit = process.wait() => exit,
        };
        // An exit observed after a cancel request never counts as success.
        if self.cancel.is_cancelled() {
            return Attempt::Canceled;
        }
        match exit {
            Ok(exit) if exit.success() => Attempt::Succeeded,
            Ok(exit) => Attempt::Failed(TransferError::Exit {
                code: exit.code,
                stderr: exit.stderr,
            }),
            Err(e) => Attempt::Failed(TransferError::Io(e)),
        }
    }

    fn observe_line(&self, line: &str) {
        let Some(sample) = progress::parse_line(line) else {
            tracing::trace!(job_id = %self.job.id, "executor: {}", line);
            return;
        };
        let Some(percent) = sample.percent() else {
            return;
        };
        if self.cancel.is_cancelled() {
            return;
        }
        emit(
            &self.events,
            UploadEvent::Progress {
                job_id: self.job.id.clone(),
                percent,
                eta: sample.eta(),
                sample,
            },
        );
    }
}
