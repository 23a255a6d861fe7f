//! CLI command handlers, one per file.

mod cancel;
mod scan;
mod show_config;
mod upload;

pub use cancel::run_cancel;
pub use scan::run_scan;
pub use show_config::run_show_config;
pub use upload::{run_upload, UploadOptions};
#[cfg(test)]
pub(crate) use upload::submit_all;
