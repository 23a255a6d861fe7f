//! Integration test: scheduler driving a real child process.
//!
//! The AWS CLI is replaced by a shell script that prints `Completed ...`
//! progress lines the way `aws s3 cp` does (carriage-return separated).
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fake_aws::FakeAws;
use s3up_core::connectivity::AlwaysReachable;
use s3up_core::events::{EventReceiver, UploadEvent};
use s3up_core::job::{JobState, RemoteTarget, TerminalOutcome};
use s3up_core::retry::RetryPolicy;
use s3up_core::scheduler::{Scheduler, SchedulerSettings};
use tempfile::tempdir;

fn scheduler(fake: &FakeAws, retry: RetryPolicy) -> (Scheduler, EventReceiver) {
    let settings = SchedulerSettings {
        max_concurrent: 2,
        retry,
        cancel_grace: Duration::from_secs(5),
    };
    Scheduler::new(
        settings,
        Arc::new(fake.executor()),
        Arc::new(AlwaysReachable),
    )
}

/// Collects events until the first terminal event (or panics after 20s).
async fn until_terminal(rx: &mut EventReceiver) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(20), async {
        while let Some(ev) = rx.recv().await {
            let done = matches!(ev, UploadEvent::Terminal { .. });
            events.push(ev);
            if done {
                break;
            }
        }
    })
    .await
    .expect("job did not finish in time");
    events
}

#[tokio::test]
async fn child_process_upload_streams_progress_and_succeeds() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("SS01");
    std::fs::create_dir(&source).unwrap();
    let fake = FakeAws::new(
        dir.path(),
        "printf 'upload: a.jpg to s3://bucket/backups/SS01/a.jpg\\n'\n\
         printf 'Completed 25.0 MiB/100.0 MiB (5.0 MiB/s) with 3 file(s) remaining\\r'\n\
         printf 'Completed 100.0 MiB/100.0 MiB (5.0 MiB/s) with 0 file(s) remaining\\r'\n\
         exit 0",
    );
    let (sched, mut rx) = scheduler(&fake, RetryPolicy::immediate(3));
    sched
        .submit(&source, RemoteTarget::new("bucket", "backups"))
        .unwrap();

    let events = until_terminal(&mut rx).await;
    let percents: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            UploadEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![25.0, 100.0]);
    assert!(matches!(
        events.last(),
        Some(UploadEvent::Terminal {
            outcome: TerminalOutcome::Succeeded,
            ..
        })
    ));
    assert_eq!(
        fake.last_args(),
        vec![
            "s3".to_string(),
            "cp".to_string(),
            source.display().to_string(),
            "s3://bucket/backups/SS01/".to_string(),
            "--recursive".to_string(),
        ]
    );
    assert_eq!(fake.calls(), 1);
}

#[tokio::test]
async fn failing_child_is_retried_and_reports_stderr() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("SS02");
    std::fs::create_dir(&source).unwrap();
    let fake = FakeAws::new(
        dir.path(),
        "echo 'upload failed: An error occurred (AccessDenied)' >&2\nexit 2",
    );
    let (sched, mut rx) = scheduler(&fake, RetryPolicy::immediate(2));
    sched
        .submit(&source, RemoteTarget::new("bucket", ""))
        .unwrap();

    let events = until_terminal(&mut rx).await;
    let started = events
        .iter()
        .filter(|e| matches!(e, UploadEvent::Started { .. }))
        .count();
    assert_eq!(started, 2);
    assert_eq!(fake.calls(), 2);
    match events.last() {
        Some(UploadEvent::Terminal { outcome, .. }) => {
            assert_eq!(outcome.state(), JobState::Failed);
            let error = outcome.error().unwrap_or_default();
            assert!(error.contains("status 2"), "error was: {error}");
            assert!(error.contains("AccessDenied"), "error was: {error}");
        }
        other => panic!("expected terminal event, got {:?}", other),
    }
}

#[tokio::test]
async fn cancel_kills_running_child() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("SS03");
    std::fs::create_dir(&source).unwrap();
    let fake = FakeAws::new(
        dir.path(),
        "printf 'Completed 1.0 MiB/100.0 MiB (1.0 MiB/s)\\n'\nexec sleep 30",
    );
    let (sched, mut rx) = scheduler(&fake, RetryPolicy::immediate(3));
    let id = sched
        .submit(&source, RemoteTarget::new("bucket", ""))
        .unwrap();

    // Wait until the child is producing output.
    loop {
        match rx.recv().await {
            Some(UploadEvent::Progress { .. }) => break,
            Some(_) => continue,
            None => panic!("event channel closed"),
        }
    }
    assert!(sched.cancel(&id));

    let events = until_terminal(&mut rx).await;
    assert!(matches!(
        events.last(),
        Some(UploadEvent::Terminal {
            outcome: TerminalOutcome::Canceled,
            ..
        })
    ));
    tokio::time::timeout(Duration::from_secs(5), sched.wait_idle())
        .await
        .expect("scheduler did not go idle");
    assert_eq!(fake.calls(), 1);
}
