//! `s3up upload <folder>...` – upload folders with bounded concurrency.

use anyhow::{bail, Context, Result};
use s3up_core::config::UploaderConfig;
use s3up_core::connectivity;
use s3up_core::control;
use s3up_core::executor::CommandExecutor;
use s3up_core::job::{RemoteTarget, SubmitError};
use s3up_core::scan::{self, ScanSummary};
use s3up_core::scheduler::Scheduler;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::cli::control_socket;
use crate::cli::report::{format_bytes, Reporter};

#[derive(Debug)]
pub struct UploadOptions {
    pub folders: Vec<PathBuf>,
    pub prefix: String,
    pub bucket: Option<String>,
    pub jobs: Option<usize>,
    pub tag_filenames: bool,
}

pub async fn run_upload(cfg: &UploaderConfig, opts: UploadOptions) -> Result<()> {
    let bucket = match opts.bucket.as_deref().or(cfg.bucket.as_deref()) {
        Some(b) if !b.trim().is_empty() => b.to_string(),
        _ => bail!("no bucket given: pass --bucket, set AWS_BUCKET or set `bucket` in config.toml"),
    };
    let target = RemoteTarget::new(bucket, &opts.prefix);

    for folder in &opts.folders {
        if !folder.is_dir() {
            bail!("{} is not a folder", folder.display());
        }
    }

    // Every folder is tagged and scanned before the first submit.
    let prepared = prepare_all(&opts.folders, opts.tag_filenames).await?;

    let mut settings = cfg.scheduler_settings();
    if let Some(jobs) = opts.jobs {
        settings.max_concurrent = jobs.max(1);
    }
    let executor = Arc::new(CommandExecutor::from_config(&cfg.executor));
    let probe = connectivity::probe_from_config(&cfg.connectivity);
    let (scheduler, mut events) = Scheduler::new(settings, executor, probe);
    tracing::info!(
        bucket = %target.bucket(),
        prefix = %target.prefix(),
        folders = opts.folders.len(),
        max_concurrent = settings.max_concurrent,
        "upload run starting"
    );

    let socket_path = control::default_control_socket_path().ok();
    let listener = socket_path.as_ref().and_then(|path| {
        match control_socket::spawn_control_listener(scheduler.clone(), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("control socket unavailable: {:#}", e);
                None
            }
        }
    });
    let stop_listener = |listener: Option<JoinHandle<()>>| {
        if let Some(handle) = listener {
            handle.abort();
        }
        if let Some(path) = &socket_path {
            let _ = std::fs::remove_file(path);
        }
    };

    let mut reporter = Reporter::new();
    let submitted = match submit_all(&scheduler, &target, &prepared).await {
        Ok(n) => n,
        Err(e) => {
            stop_listener(listener);
            return Err(e);
        }
    };

    let mut interrupted = false;
    {
        let idle = scheduler.wait_idle();
        tokio::pin!(idle);
        loop {
            tokio::select! {
                Some(ev) = events.recv() => {
                    if let Some(line) = reporter.handle(&ev, Instant::now()) {
                        println!("{line}");
                    }
                }
                _ = &mut idle => break,
                res = tokio::signal::ctrl_c(), if !interrupted => {
                    if let Err(e) = res {
                        tracing::warn!("ctrl-c handler: {}", e);
                    }
                    interrupted = true;
                    println!("Interrupted, canceling all uploads...");
                    scheduler.cancel_all().await;
                }
            }
        }
    }
    while let Ok(ev) = events.try_recv() {
        if let Some(line) = reporter.handle(&ev, Instant::now()) {
            println!("{line}");
        }
    }

    stop_listener(listener);

    let summary = reporter.summary();
    println!(
        "{} upload(s): {} succeeded, {} failed, {} canceled",
        summary.total().max(submitted),
        summary.succeeded.len(),
        summary.failed.len(),
        summary.canceled.len()
    );
    for (id, error) in &summary.failed {
        println!("  failed: {id}: {error}");
    }
    tracing::info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        canceled = summary.canceled.len(),
        "upload run finished"
    );

    if !summary.failed.is_empty() {
        bail!("{} upload(s) failed", summary.failed.len());
    }
    if interrupted {
        bail!("interrupted");
    }
    Ok(())
}

async fn prepare_all(folders: &[PathBuf], tag_filenames: bool) -> Result<Vec<(PathBuf, ScanSummary)>> {
    let mut prepared = Vec::with_capacity(folders.len());
    for folder in folders {
        let summary = prepare_folder(folder, tag_filenames).await?;
        prepared.push((folder.clone(), summary));
    }
    Ok(prepared)
}

/// Submits every prepared folder, skipping ones already queued.
///
/// On any other submit error the jobs submitted so far are canceled and
/// waited for before the error is returned.
pub(crate) async fn submit_all(
    scheduler: &Scheduler,
    target: &RemoteTarget,
    prepared: &[(PathBuf, ScanSummary)],
) -> Result<usize> {
    let mut submitted = 0usize;
    for (folder, summary) in prepared {
        match scheduler.submit_scanned(folder, target.clone(), Some(*summary)) {
            Ok(id) => {
                submitted += 1;
                println!(
                    "{} -> {}  ({} file(s), {})",
                    id,
                    target.url_for_folder(id.display_name()),
                    summary.files,
                    format_bytes(summary.bytes)
                );
            }
            Err(SubmitError::Duplicate(id)) => {
                println!("{id} is already queued, skipping");
            }
            Err(e) => {
                tracing::warn!(submitted, "submit failed, canceling submitted uploads");
                scheduler.cancel_all().await;
                return Err(e.into());
            }
        }
    }
    Ok(submitted)
}

/// Optionally tags file names, then scans the folder. Runs on the blocking pool.
async fn prepare_folder(folder: &Path, tag_filenames: bool) -> Result<ScanSummary> {
    let path = folder.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if tag_filenames {
            let renamed = scan::tag_filenames(&path)?;
            tracing::info!(folder = %path.display(), renamed, "tagged file names");
        }
        scan::scan_tree(&path)
    })
    .await
    .with_context(|| format!("scan {}", folder.display()))?
}
