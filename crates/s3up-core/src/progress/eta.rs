use std::fmt;

/// Estimated time remaining for a transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    /// No rate (or a zero rate) was reported.
    Unknown,
    /// Seconds remaining at the last reported rate.
    Seconds(f64),
}

impl Eta {
    pub fn as_secs(&self) -> Option<f64> {
        match self {
            Eta::Unknown => None,
            Eta::Seconds(s) => Some(*s),
        }
    }
}

/// Coarse, human-oriented label: `~2h`, `~5min`, `~40s` or `unknown`.
///
/// Only the largest unit is shown; it is rounded up when the next unit down
/// is at least half way (e.g. 1h35m is `~2h`, 4m30s is `~5min`).
impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = match self {
            Eta::Seconds(s) if s.is_finite() && *s >= 0.0 => *s as u64,
            _ => return f.write_str("unknown"),
        };
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;
        if hours > 0 {
            let hours = if minutes >= 30 { hours + 1 } else { hours };
            write!(f, "~{}h", hours)
        } else if minutes > 0 {
            let minutes = if seconds >= 30 { minutes + 1 } else { minutes };
            write!(f, "~{}min", minutes)
        } else {
            write!(f, "~{}s", seconds)
        }
    }
}
