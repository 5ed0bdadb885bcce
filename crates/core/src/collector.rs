use crate::error::{Result, TransformError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerates every file below a root.
///
/// The walk is iterative and lazy; directories are descended into but never
/// yielded. Any traversal error (including an unreadable root) is surfaced as
/// [`TransformError::Collect`].
pub struct FileCollector {
    root: PathBuf,
}

impl FileCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => Some(Ok(entry.into_path())),
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    Some(Err(TransformError::Collect { path, source }))
                }
            })
    }

    /// Drains the walk, failing on the first traversal error.
    pub fn collect_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            // walkdir yields a lone file root as an entry; a source root must be a directory
            return Err(TransformError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source root {} is not a directory", self.root.display()),
            )));
        }
        self.walk().collect()
    }
}
