//! Progress reporting for uploads (KiB done, KiB total, rate, ETA).
//!
//! The transfer executor prints textual `Completed ...` lines; this module
//! turns them into [`ProgressSample`]s with every quantity in KiB so that
//! percent/ETA arithmetic never mixes units.

mod eta;
mod parse;
mod sample;

pub use eta::Eta;
pub use parse::parse_line;
pub use sample::ProgressSample;
