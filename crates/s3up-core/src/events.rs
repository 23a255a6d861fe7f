//! Events emitted by the scheduler and workers for the presentation layer.
//!
//! Events for one job arrive in the order they happened. Exactly one
//! `Terminal` event is sent for every job that was accepted by `enqueue`.

use tokio::sync::mpsc;

use crate::job::{JobId, TerminalOutcome};
use crate::progress::{Eta, ProgressSample};

/// Sending half handed to workers.
pub type EventSender = mpsc::UnboundedSender<UploadEvent>;
/// Receiving half returned to the presentation layer.
pub type EventReceiver = mpsc::UnboundedReceiver<UploadEvent>;

/// Why a job is waiting instead of transferring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReason {
    /// Connectivity check failed; the attempt was skipped.
    Offline,
    /// The previous attempt failed with `error`; a new attempt follows after backoff.
    Retrying { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Job accepted and waiting for a free slot.
    Queued { job_id: JobId },
    /// The transfer executor was invoked (`attempt` is 1-based).
    Started { job_id: JobId, attempt: u32 },
    /// A progress line was parsed.
    Progress {
        job_id: JobId,
        percent: f64,
        eta: Eta,
        sample: ProgressSample,
    },
    /// The job is backing off before its next attempt.
    Waiting {
        job_id: JobId,
        attempt: u32,
        reason: WaitReason,
    },
    /// The job reached a terminal state.
    Terminal {
        job_id: JobId,
        outcome: TerminalOutcome,
    },
}

impl UploadEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            UploadEvent::Queued { job_id }
            | UploadEvent::Started { job_id, .. }
            | UploadEvent::Progress { job_id, .. }
            | UploadEvent::Waiting { job_id, .. }
            | UploadEvent::Terminal { job_id, .. } => job_id,
        }
    }
}

/// Sends `event`, ignoring a dropped receiver (nobody is watching any more).
pub(crate) fn emit(tx: &EventSender, event: UploadEvent) {
    let _ = tx.send(event);
}

/// Unbounded so that progress bursts never block a worker and terminal events are never dropped.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
