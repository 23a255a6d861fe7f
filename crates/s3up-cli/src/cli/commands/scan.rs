//! `s3up scan <folder>...` – file count and size per folder.

use anyhow::{bail, Result};
use s3up_core::scan;
use std::path::PathBuf;

use crate::cli::report::format_bytes;

pub async fn run_scan(folders: &[PathBuf]) -> Result<()> {
    for folder in folders {
        if !folder.is_dir() {
            bail!("{} is not a folder", folder.display());
        }
        let path = folder.clone();
        let summary = tokio::task::spawn_blocking(move || scan::scan_tree(&path)).await??;
        println!(
            "{}  {} file(s), {}",
            folder.display(),
            summary.files,
            format_bytes(summary.bytes)
        );
    }
    Ok(())
}
