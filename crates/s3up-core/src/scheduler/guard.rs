//! RAII guard that frees a worker slot when the worker task ends.

use std::sync::Arc;

use super::Shared;
use crate::job::{JobId, TerminalOutcome};
use crate::worker::TerminalResult;

/// Releases the job's slot when dropped.
///
/// The normal path is [`SlotGuard::complete`]. If the worker task panics or is
/// aborted first, `Drop` still reports a terminal outcome so the slot is freed
/// and the queue keeps moving.
pub(super) struct SlotGuard {
    shared: Arc<Shared>,
    job_id: JobId,
    serial: u64,
    released: bool,
}

impl SlotGuard {
    pub(super) fn new(shared: Arc<Shared>, job_id: JobId, serial: u64) -> Self {
        Self {
            shared,
            job_id,
            serial,
            released: false,
        }
    }

    pub(super) fn complete(mut self, result: TerminalResult) {
        self.released = true;
        self.shared
            .on_job_terminal(&self.job_id, self.serial, result.outcome, result.attempts);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let outcome = if self.shared.is_cancel_requested(&self.job_id) {
            TerminalOutcome::Canceled
        } else {
            tracing::error!(job_id = %self.job_id, "upload worker stopped without reporting");
            TerminalOutcome::Failed {
                error: "upload worker stopped unexpectedly".to_string(),
            }
        };
        self.shared
            .on_job_terminal(&self.job_id, self.serial, outcome, 0);
    }
}
