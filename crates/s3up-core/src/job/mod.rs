//! Upload jobs: one local folder to one remote prefix.

mod id;
mod state;
mod target;

use std::path::{Path, PathBuf};

pub use id::JobId;
pub use state::{JobState, TerminalOutcome};
pub use target::RemoteTarget;

use crate::scan::ScanSummary;

/// Error returned when a job cannot be submitted.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// A job with the same id is already queued or running.
    #[error("job {0} is already queued or running")]
    Duplicate(JobId),
    /// The source path cannot be turned into a job (no folder name, cwd unavailable, ...).
    #[error("invalid source folder {}: {reason}", .path.display())]
    InvalidSource { path: PathBuf, reason: String },
}

/// The unit of work handed to the scheduler.
///
/// Execution state (attempts, cancellation, running/retrying) is owned by the
/// scheduler and the worker, not by this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    /// Normalized absolute path of the folder to upload.
    pub source: PathBuf,
    pub target: RemoteTarget,
    /// File/byte totals from the local scan, if one was done before submission.
    pub scan: Option<ScanSummary>,
}

impl Job {
    /// Builds a job for `source`; the id is the normalized absolute source path.
    pub fn new(source: impl AsRef<Path>, target: RemoteTarget) -> Result<Self, SubmitError> {
        let source = source.as_ref();
        let normalized = id::normalize(source).map_err(|e| SubmitError::InvalidSource {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
        if normalized.file_name().is_none() {
            return Err(SubmitError::InvalidSource {
                path: source.to_path_buf(),
                reason: "path has no folder name".to_string(),
            });
        }
        Ok(Self {
            id: JobId::from_normalized(&normalized),
            source: normalized,
            target,
            scan: None,
        })
    }

    /// Last component of the source path, used as the remote folder name.
    pub fn folder_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Full remote URL the folder is copied to.
    pub fn destination_url(&self) -> String {
        self.target.url_for_folder(&self.folder_name())
    }
}
