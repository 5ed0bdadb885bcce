use std::io;
use std::path::Path;

/// Read/write access to source text. The pipeline only touches files through
/// this trait.
pub trait SourceStore: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, text: &str) -> io::Result<()>;
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl SourceStore for FsStore {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        std::fs::write(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fs_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        FsStore.write(&path, "let a = 1;").unwrap();
        assert_eq!(FsStore.read_to_string(&path).unwrap(), "let a = 1;");
    }

    #[test]
    fn test_fs_store_missing_file() {
        let dir = tempdir().unwrap();
        let err = FsStore
            .read_to_string(&dir.path().join("nope.js"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
