//! Resolved worker path -> worker source text.
//!
//! Built once per run from the references discovered by the scan, then
//! frozen. Lookups during the rewrite phase take `&self` only.

use crate::model::{WorkerModule, WorkerReference};
use crate::store::SourceStore;
use dashmap::DashMap;
use indexmap::IndexSet;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Why a worker path has no content in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMiss {
    NotFound,
    Unreadable(String),
}

impl From<io::Error> for WorkerMiss {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => WorkerMiss::NotFound,
            _ => WorkerMiss::Unreadable(err.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerRegistry {
    entries: HashMap<PathBuf, Result<WorkerModule, WorkerMiss>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every distinct resolved path once, on the current rayon pool.
    /// Duplicate paths coalesce into a single read.
    pub fn build<I>(paths: I, store: &dyn SourceStore) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self::build_seeded(paths, &HashMap::new(), store)
    }

    /// Like [`build`](Self::build), but paths present in `known` take their
    /// text from there and are not read again.
    pub fn build_seeded<I>(
        paths: I,
        known: &HashMap<&Path, &str>,
        store: &dyn SourceStore,
    ) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let distinct: IndexSet<PathBuf> = paths.into_iter().collect();
        let staging: DashMap<PathBuf, Result<WorkerModule, WorkerMiss>> =
            DashMap::with_capacity(distinct.len());

        distinct.par_iter().for_each(|path| {
            staging.entry(path.clone()).or_insert_with(|| {
                if let Some(text) = known.get(path.as_path()) {
                    return Ok(WorkerModule {
                        resolved_path: path.clone(),
                        text: text.to_string(),
                    });
                }
                debug!("Reading worker module {}", path.display());
                match store.read_to_string(path) {
                    Ok(text) => Ok(WorkerModule {
                        resolved_path: path.clone(),
                        text,
                    }),
                    Err(e) => {
                        debug!("Worker module {} unavailable: {}", path.display(), e);
                        Err(WorkerMiss::from(e))
                    }
                }
            });
        });

        Self {
            entries: staging.into_iter().collect(),
        }
    }

    /// Builds the registry for the targets of `references`.
    pub fn from_references<'r>(
        references: impl IntoIterator<Item = &'r WorkerReference>,
        store: &dyn SourceStore,
    ) -> Self {
        Self::build(references.into_iter().map(|r| r.resolved_path()), store)
    }

    /// Content for `path`. Paths that were never registered are `NotFound`.
    pub fn lookup(&self, path: &Path) -> Result<&WorkerModule, WorkerMiss> {
        match self.entries.get(path) {
            Some(Ok(module)) => Ok(module),
            Some(Err(miss)) => Err(miss.clone()),
            None => Err(WorkerMiss::NotFound),
        }
    }

    /// Every registered path, sorted, whether or not it could be read.
    pub fn worker_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of registered paths with readable content.
    pub fn available(&self) -> usize {
        self.entries.values().filter(|e| e.is_ok()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store that counts reads per path.
    #[derive(Default)]
    struct CountingStore {
        files: HashMap<PathBuf, String>,
        reads: Mutex<HashMap<PathBuf, usize>>,
    }

    impl CountingStore {
        fn with(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, t)| (PathBuf::from(p), t.to_string()))
                    .collect(),
                reads: Mutex::new(HashMap::new()),
            }
        }

        fn reads_of(&self, path: &str) -> usize {
            *self.reads.lock().unwrap().get(Path::new(path)).unwrap_or(&0)
        }
    }

    impl SourceStore for CountingStore {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            *self
                .reads
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_default() += 1;
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }

        fn write(&self, _path: &Path, _text: &str) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_duplicate_paths_read_once() {
        let store = CountingStore::with(&[("/src/w.js", "self.x = 1;")]);
        let paths = vec![
            PathBuf::from("/src/w.js"),
            PathBuf::from("/src/w.js"),
            PathBuf::from("/src/w.js"),
        ];

        let registry = WorkerRegistry::build(paths, &store);

        assert_eq!(store.reads_of("/src/w.js"), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(Path::new("/src/w.js")).unwrap().text,
            "self.x = 1;"
        );
    }

    #[test]
    fn test_missing_worker_recorded_not_fatal() {
        let store = CountingStore::with(&[("/src/ok.js", "ok")]);
        let registry = WorkerRegistry::build(
            vec![PathBuf::from("/src/gone.js"), PathBuf::from("/src/ok.js")],
            &store,
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.available(), 1);
        assert_eq!(
            registry.lookup(Path::new("/src/gone.js")).unwrap_err(),
            WorkerMiss::NotFound
        );
        assert!(registry.lookup(Path::new("/src/ok.js")).is_ok());
    }

    #[test]
    fn test_unregistered_lookup_is_not_found() {
        let registry = WorkerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.lookup(Path::new("/nowhere.js")).unwrap_err(),
            WorkerMiss::NotFound
        );
    }

    #[test]
    fn test_from_references_resolves_against_owner() {
        let store = CountingStore::with(&[("/p/src/w.js", "w")]);
        let refs = vec![
            WorkerReference {
                owner_path: PathBuf::from("/p/src/a.js"),
                matched_text: String::new(),
                literal_path: "./w.js".to_string(),
                span: 0..0,
            },
            WorkerReference {
                owner_path: PathBuf::from("/p/src/nested/b.js"),
                matched_text: String::new(),
                literal_path: "../w.js".to_string(),
                span: 0..0,
            },
        ];

        let registry = WorkerRegistry::from_references(&refs, &store);
        assert_eq!(registry.worker_paths(), vec![PathBuf::from("/p/src/w.js")]);
        assert_eq!(store.reads_of("/p/src/w.js"), 1);
    }

    #[test]
    fn test_seeded_paths_are_not_read() {
        let store = CountingStore::with(&[("/src/w.js", "from disk"), ("/src/v.js", "v")]);
        let known = HashMap::from([(Path::new("/src/w.js"), "already scanned")]);

        let registry = WorkerRegistry::build_seeded(
            vec![PathBuf::from("/src/w.js"), PathBuf::from("/src/v.js")],
            &known,
            &store,
        );

        assert_eq!(store.reads_of("/src/w.js"), 0);
        assert_eq!(store.reads_of("/src/v.js"), 1);
        assert_eq!(
            registry.lookup(Path::new("/src/w.js")).unwrap().text,
            "already scanned"
        );
    }

    #[test]
    fn test_io_error_kinds_map_to_misses() {
        let nf = WorkerMiss::from(io::Error::new(io::ErrorKind::NotFound, "x"));
        assert_eq!(nf, WorkerMiss::NotFound);
        let denied = WorkerMiss::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(denied, WorkerMiss::Unreadable(_)));
    }
}
