//! In-memory executor for worker and scheduler tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{TransferExecutor, TransferExit, TransferProcess};
use crate::job::Job;
use crate::retry::TransferError;

/// What a scripted transfer does on each attempt.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    /// Lines printed before exiting.
    pub lines: Vec<String>,
    /// Exit code per attempt; the last one repeats. Empty means always 0.
    pub exit_codes: Vec<i32>,
    /// After the lines, block until terminated instead of exiting.
    pub hang: bool,
    /// Fail to start at all.
    pub spawn_error: bool,
    /// Delay before each line (and before exiting).
    pub delay: Duration,
    /// Never return from `start` (after recording the attempt).
    pub stall_start: bool,
}

impl Script {
    pub fn succeed() -> Self {
        Self::default()
    }

    pub fn fail() -> Self {
        Self {
            exit_codes: vec![1],
            ..Self::default()
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    scripts: Mutex<HashMap<PathBuf, Script>>,
    fallback: Mutex<Script>,
    starts: Mutex<Vec<PathBuf>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    terminated: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script used for sources without their own script.
    pub fn with_fallback(self, script: Script) -> Self {
        *self.fallback.lock().unwrap() = script;
        self
    }

    pub fn script(&self, source: impl AsRef<Path>, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(source.as_ref().to_path_buf(), script);
    }

    /// Sources in the order their transfers were started (one entry per attempt).
    pub fn starts(&self) -> Vec<PathBuf> {
        self.starts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, source: impl AsRef<Path>) -> usize {
        let source = source.as_ref();
        self.starts().iter().filter(|s| s.as_path() == source).count()
    }

    /// Highest number of transfers alive at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferExecutor for ScriptedExecutor {
    async fn start(&self, job: &Job) -> Result<Box<dyn TransferProcess>, TransferError> {
        let attempt = {
            let mut starts = self.starts.lock().unwrap();
            starts.push(job.source.clone());
            starts.iter().filter(|s| **s == job.source).count()
        };
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&job.source)
            .cloned()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        if script.stall_start {
            std::future::pending::<()>().await;
        }
        if script.spawn_error {
            return Err(TransferError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "scripted spawn failure",
            )));
        }
        let exit_code = script
            .exit_codes
            .get(attempt - 1)
            .or(script.exit_codes.last())
            .copied()
            .unwrap_or(0);

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(ScriptedProcess {
            lines: script.lines.into_iter().collect(),
            exit_code,
            hang: script.hang,
            delay: script.delay,
            alive: Some(RunningGuard(Arc::clone(&self.running))),
            terminated: Arc::clone(&self.terminated),
        }))
    }
}

struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ScriptedProcess {
    lines: VecDeque<String>,
    exit_code: i32,
    hang: bool,
    delay: Duration,
    alive: Option<RunningGuard>,
    terminated: Arc<AtomicUsize>,
}

impl ScriptedProcess {
    async fn pause(&self) {
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl TransferProcess for ScriptedProcess {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.pause().await;
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }

    async fn wait(&mut self) -> std::io::Result<TransferExit> {
        self.alive.take();
        let stderr = if self.exit_code == 0 {
            String::new()
        } else {
            "scripted failure".to_string()
        };
        Ok(TransferExit {
            code: Some(self.exit_code),
            stderr,
        })
    }

    async fn terminate(&mut self) {
        if self.alive.take().is_some() {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
        self.lines.clear();
        self.hang = false;
    }
}
