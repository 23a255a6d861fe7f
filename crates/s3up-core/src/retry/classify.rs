//! Classify transfer errors into retry policy error kinds.

use super::error::TransferError;
use super::policy::ErrorKind;

/// Classify a transfer attempt error into an ErrorKind.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Spawn(_) => ErrorKind::Fatal,
        TransferError::Exit { .. } => ErrorKind::ExecutorFailed,
        TransferError::Io(_) => ErrorKind::Io,
    }
}
