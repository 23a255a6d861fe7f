//! Local folder scanning: file/byte totals and filename tagging.
//!
//! Uploads are keyed by folder, but files from different shoots often share
//! names (`IMG_0001.JPG`). `tag_filenames` appends the containing folder name to
//! each file stem so that objects stay distinguishable once uploaded.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File count and byte total for a folder tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: u64,
    pub bytes: u64,
}

/// Walks `root` recursively and totals regular files (symlinks are not followed).
pub fn scan_tree(root: &Path) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        summary.files += 1;
        summary.bytes += meta.len();
    }
    Ok(summary)
}

/// New file name for `path` with `_<folder>` appended to its stem, or `None`
/// if it is already tagged.
fn tagged_name(path: &Path, folder: &str) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let suffix = format!("_{}", folder);
    if stem.ends_with(&suffix) {
        return None;
    }
    Some(match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    })
}

/// Renames every file under `root` to `<stem>_<parent folder><ext>`.
///
/// Already-tagged files are left alone, so running it twice is a no-op.
/// Returns the number of files renamed.
pub fn tag_filenames(root: &Path) -> Result<usize> {
    let mut renames: Vec<(PathBuf, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(folder) = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        if let Some(name) = tagged_name(path, &folder) {
            renames.push((path.to_path_buf(), path.with_file_name(name)));
        }
    }

    let mut renamed = 0;
    for (from, to) in &renames {
        if to.exists() {
            tracing::warn!(from = %from.display(), to = %to.display(), "tag target exists, skipping");
            continue;
        }
        fs::rename(from, to)
            .with_context(|| format!("rename {} -> {}", from.display(), to.display()))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "tagged file");
        renamed += 1;
    }
    Ok(renamed)
}
