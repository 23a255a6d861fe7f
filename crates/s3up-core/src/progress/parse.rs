//! Parser for the transfer executor's progress lines:
//!
//! `Completed <done><U>/~?<total><U> (<rate><U>/s)` with `U` one of
//! `B`/`Bytes`, `KiB`, `MiB`, `GiB`. The rate clause is optional and any text
//! after it (e.g. `with 3 file(s) remaining`) is ignored.

use regex::Regex;
use std::sync::OnceLock;

use super::sample::ProgressSample;

const NUMBER: &str = r"(\d+(?:\.\d+)?)";
const UNIT: &str = r"(Bytes|B|KiB|MiB|GiB)";

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"^\s*Completed\s+{n}\s*{u}/~?{n}\s*{u}(?:\s*\({n}\s*{u}/s\))?",
            n = NUMBER,
            u = UNIT
        );
        Regex::new(&pattern).expect("progress line pattern is valid")
    })
}

/// Converts a quantity in `unit` to KiB.
fn to_kib(value: f64, unit: &str) -> f64 {
    match unit {
        "B" | "Bytes" => value / 1024.0,
        "MiB" => value * 1024.0,
        "GiB" => value * 1024.0 * 1024.0,
        _ => value,
    }
}

/// Parses one line of executor output. Returns `None` for anything that is not
/// a progress line; never fails.
pub fn parse_line(line: &str) -> Option<ProgressSample> {
    let caps = line_regex().captures(line)?;
    let quantity = |value: usize, unit: usize| -> Option<f64> {
        let v: f64 = caps.get(value)?.as_str().parse().ok()?;
        Some(to_kib(v, caps.get(unit)?.as_str()))
    };
    Some(ProgressSample {
        completed_kib: quantity(1, 2)?,
        total_kib: quantity(3, 4)?,
        rate_kib_per_sec: quantity(5, 6),
    })
}
