//! Connectivity check consulted before each transfer attempt.
//!
//! Uses the curl crate (libcurl) to send a HEAD request to a well-known
//! endpoint with short connect/overall timeouts, so a dead network costs at
//! most a few seconds per attempt rather than a hung worker.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConnectivityConfig;

/// Advisory "is the network reachable" predicate.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Must return within a bounded time; errors count as unreachable.
    async fn is_reachable(&self) -> bool;
}

/// Probe that never gates anything (connectivity checks disabled).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReachable;

#[async_trait]
impl ConnectivityProbe for AlwaysReachable {
    async fn is_reachable(&self) -> bool {
        true
    }
}

/// HEAD request against `url`; any 2xx/3xx response means reachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout: timeout.max(Duration::from_millis(100)),
        }
    }
}

/// Builds the probe described by `cfg`.
pub fn probe_from_config(cfg: &ConnectivityConfig) -> Arc<dyn ConnectivityProbe> {
    if cfg.enabled {
        Arc::new(HttpProbe::new(
            cfg.url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        ))
    } else {
        Arc::new(AlwaysReachable)
    }
}

/// Runs in the current thread; call from `spawn_blocking` if used from async code.
fn head_status(url: &str, timeout: Duration) -> Result<u32, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?; // HEAD request
    easy.follow_location(true)?;
    easy.connect_timeout(timeout)?;
    easy.timeout(timeout)?;
    easy.perform()?;
    easy.response_code()
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        let url = self.url.clone();
        let timeout = self.timeout;
        let probe = tokio::task::spawn_blocking(move || head_status(&url, timeout));
        // libcurl enforces `timeout`; the outer bound covers DNS stalls it cannot interrupt.
        match tokio::time::timeout(timeout + Duration::from_secs(1), probe).await {
            Ok(Ok(Ok(code))) if (200..400).contains(&code) => true,
            Ok(Ok(Ok(code))) => {
                tracing::debug!(url = %self.url, code, "connectivity probe: unexpected status");
                false
            }
            Ok(Ok(Err(e))) => {
                tracing::debug!(url = %self.url, "connectivity probe failed: {}", e);
                false
            }
            Ok(Err(e)) => {
                tracing::warn!("connectivity probe task: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!(url = %self.url, "connectivity probe timed out");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers from a fixed list, then `fallback` forever.
    pub(crate) struct ScriptedProbe {
        answers: Mutex<VecDeque<bool>>,
        fallback: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        pub fn new(answers: &[bool], fallback: bool) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectivityProbe for ScriptedProbe {
        async fn is_reachable(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback)
        }
    }
}
