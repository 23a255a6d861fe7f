//! Tests for submitting prepared folders.

use crate::cli::commands::submit_all;
use async_trait::async_trait;
use s3up_core::connectivity::AlwaysReachable;
use s3up_core::executor::{TransferExecutor, TransferExit, TransferProcess};
use s3up_core::job::{Job, RemoteTarget};
use s3up_core::retry::TransferError;
use s3up_core::scan::ScanSummary;
use s3up_core::scheduler::{Scheduler, SchedulerSettings};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transfers that never finish on their own.
#[derive(Default)]
struct Endless {
    started: AtomicUsize,
    terminated: Arc<AtomicUsize>,
}

struct EndlessProcess {
    terminated: Arc<AtomicUsize>,
    done: bool,
}

#[async_trait]
impl TransferExecutor for Endless {
    async fn start(&self, _job: &Job) -> Result<Box<dyn TransferProcess>, TransferError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EndlessProcess {
            terminated: Arc::clone(&self.terminated),
            done: false,
        }))
    }
}

#[async_trait]
impl TransferProcess for EndlessProcess {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        std::future::pending().await
    }

    async fn wait(&mut self) -> std::io::Result<TransferExit> {
        Ok(TransferExit {
            code: None,
            stderr: String::new(),
        })
    }

    async fn terminate(&mut self) {
        if !self.done {
            self.done = true;
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn prepared(paths: &[&str]) -> Vec<(PathBuf, ScanSummary)> {
    paths
        .iter()
        .map(|p| (PathBuf::from(p), ScanSummary { files: 1, bytes: 1024 }))
        .collect()
}

fn scheduler(executor: Arc<Endless>) -> Scheduler {
    let settings = SchedulerSettings {
        max_concurrent: 2,
        cancel_grace: Duration::from_secs(5),
        ..SchedulerSettings::default()
    };
    let (scheduler, _events) = Scheduler::new(settings, executor, Arc::new(AlwaysReachable));
    scheduler
}

#[tokio::test]
async fn submit_error_cancels_jobs_already_running() {
    let executor = Arc::new(Endless::default());
    let sched = scheduler(Arc::clone(&executor));
    let target = RemoteTarget::new("media", "ARCHIVE");

    submit_all(&sched, &target, &prepared(&["/data/F1"]))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while executor.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // "/" has no folder name, so its submit fails while F1 is uploading.
    let err = submit_all(&sched, &target, &prepared(&["/data/F2", "/"]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no folder name"), "{err:#}");
    let started = executor.started.load(Ordering::SeqCst);
    assert!(started >= 1);
    assert_eq!(executor.terminated.load(Ordering::SeqCst), started);
    let snap = sched.snapshot();
    assert_eq!(snap.active, 0);
    assert!(snap.queued.is_empty());
}

#[tokio::test]
async fn duplicates_are_skipped_and_counted_once() {
    let executor = Arc::new(Endless::default());
    let sched = scheduler(Arc::clone(&executor));
    let target = RemoteTarget::new("media", "ARCHIVE");

    let submitted = submit_all(&sched, &target, &prepared(&["/data/F1", "/data/F1/", "/data/F2"]))
        .await
        .unwrap();

    assert_eq!(submitted, 2);
    assert_eq!(sched.active_count(), 2);
    sched.cancel_all().await;
    assert_eq!(sched.active_count(), 0);
}
