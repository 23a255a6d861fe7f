//! Turns scheduler events into console lines and keeps the run summary.

use s3up_core::events::{UploadEvent, WaitReason};
use s3up_core::job::{JobId, TerminalOutcome};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Minimum gap between two progress lines for the same job.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct Summary {
    pub succeeded: Vec<JobId>,
    pub failed: Vec<(JobId, String)>,
    pub canceled: Vec<JobId>,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.canceled.len()
    }
}

#[derive(Debug, Default)]
pub struct Reporter {
    last_progress: HashMap<JobId, Instant>,
    summary: Summary,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Line to print for `ev`, if any. Progress lines are throttled per job
    /// except for the final 100% line.
    pub fn handle(&mut self, ev: &UploadEvent, now: Instant) -> Option<String> {
        let name = ev.job_id().display_name().to_string();
        match ev {
            UploadEvent::Queued { .. } => Some(format!("[{name}] queued")),
            UploadEvent::Started { attempt, .. } => {
                if *attempt > 1 {
                    Some(format!("[{name}] uploading (attempt {attempt})"))
                } else {
                    Some(format!("[{name}] uploading"))
                }
            }
            UploadEvent::Progress {
                job_id,
                percent,
                eta,
                sample,
            } => {
                let due = match self.last_progress.get(job_id) {
                    Some(last) => now.duration_since(*last) >= PROGRESS_INTERVAL,
                    None => true,
                };
                if !due && *percent < 100.0 {
                    return None;
                }
                self.last_progress.insert(job_id.clone(), now);
                let rate = sample
                    .rate_kib_per_sec
                    .map(|r| format!("  {}/s", format_bytes((r * 1024.0) as u64)))
                    .unwrap_or_default();
                Some(format!(
                    "[{name}] {:5.1}%  {} / {}{rate}  ETA {eta}",
                    percent,
                    format_bytes((sample.completed_kib * 1024.0) as u64),
                    format_bytes((sample.total_kib * 1024.0) as u64),
                ))
            }
            UploadEvent::Waiting {
                attempt, reason, ..
            } => match reason {
                WaitReason::Offline => Some(format!(
                    "[{name}] network unreachable, waiting to retry (attempt {attempt})"
                )),
                WaitReason::Retrying { error } => Some(format!(
                    "[{name}] attempt {attempt} failed: {error}; retrying"
                )),
            },
            UploadEvent::Terminal { job_id, outcome } => {
                self.last_progress.remove(job_id);
                match outcome {
                    TerminalOutcome::Succeeded => {
                        self.summary.succeeded.push(job_id.clone());
                        Some(format!("[{name}] done"))
                    }
                    TerminalOutcome::Failed { error } => {
                        self.summary.failed.push((job_id.clone(), error.clone()));
                        Some(format!("[{name}] FAILED: {error}"))
                    }
                    TerminalOutcome::Canceled => {
                        self.summary.canceled.push(job_id.clone());
                        Some(format!("[{name}] canceled"))
                    }
                }
            }
        }
    }
}

/// Human-readable size with binary units (`12.3 MiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
