//! Retry and backoff policy.
//!
//! This module encapsulates error classification (executor failures,
//! connectivity loss, spawn errors) and backoff decisions so that the upload
//! worker applies one consistent, capped policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::classify;
pub use error::TransferError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::wait_backoff;
