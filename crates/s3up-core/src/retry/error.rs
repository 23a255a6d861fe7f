//! Transfer attempt error type for retry classification.

/// Error from a single transfer attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The executor could not be started (binary missing, permission denied). Not retried.
    #[error("could not start transfer executor: {0}")]
    Spawn(#[source] std::io::Error),
    /// The executor ran and exited unsuccessfully; `stderr` is the tail of its error output.
    #[error("transfer executor exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    Exit { code: Option<i32>, stderr: String },
    /// Reading the executor's output or waiting for it failed.
    #[error("transfer executor I/O: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
