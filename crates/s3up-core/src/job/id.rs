use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Job identifier: the normalized absolute path of the source folder.
///
/// Two folders with the same name under different parents get different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    /// Wraps an already-normalized id (e.g. one received over the control socket).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for a source path, resolving it against the current directory.
    pub fn from_source(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_normalized(&normalize(path.as_ref())?))
    }

    pub(super) fn from_normalized(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short name for display: the last path component.
    pub fn display_name(&self) -> &str {
        Path::new(&self.0)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Makes `path` absolute and removes `.`/`..` components and trailing
/// separators without touching the filesystem.
pub(super) fn normalize(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
