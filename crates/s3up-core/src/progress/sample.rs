use super::eta::Eta;

/// One progress sample reported by the transfer executor, normalized to KiB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    /// KiB transferred so far.
    pub completed_kib: f64,
    /// Total KiB for the transfer (may be an estimate while the executor is still listing).
    pub total_kib: f64,
    /// Instantaneous rate in KiB/s, if the executor reported one.
    pub rate_kib_per_sec: Option<f64>,
}

impl ProgressSample {
    /// Percent complete in `[0.0, 100.0]`, or `None` when the total is not known yet.
    pub fn percent(&self) -> Option<f64> {
        if self.total_kib.is_nan() || self.total_kib <= 0.0 {
            return None;
        }
        Some((self.completed_kib / self.total_kib * 100.0).clamp(0.0, 100.0))
    }

    /// KiB left to transfer (never negative).
    pub fn remaining_kib(&self) -> f64 {
        (self.total_kib - self.completed_kib).max(0.0)
    }

    /// Estimated time remaining. Unknown when the rate is absent or zero.
    pub fn eta(&self) -> Eta {
        match self.rate_kib_per_sec {
            Some(rate) if rate > 0.0 => Eta::Seconds(self.remaining_kib() / rate),
            _ => Eta::Unknown,
        }
    }
}
