//! Run orchestration.
//!
//! Phases run strictly in order, each one completing before the next starts:
//!
//! ```text
//! collect ──▶ scan (parallel) ──▶ registry (parallel, dedup) ──▶ rewrite ──▶ write
//!                                         ▲
//!                                   barrier: every worker
//!                                   read attempted first
//! ```
//!
//! Only collection failures are fatal. Everything after that is reported as a
//! [`Diagnostic`] and processing continues with the next match or file.

use crate::classifier::{WorkerClassifier, classifier_for};
use crate::collector::FileCollector;
use crate::config::TransformConfig;
use crate::error::Result;
use crate::model::{Diagnostic, DiagnosticKind, ScannedFile, SourceFile, absolutize};
use crate::registry::WorkerRegistry;
use crate::rewriter::{RewriteOutcome, SourceRewriter};
use crate::scanner::ReferenceScanner;
use crate::store::{FsStore, SourceStore};
use indexmap::IndexSet;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Terminal state of a scanned file that had at least one match. Files
/// without matches never leave the scan phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Matches found, but every one was unresolved; nothing to write.
    Unchanged,
    /// New text computed; not written because of a dry run.
    Rewritten,
    Written,
    WriteFailed,
}

#[derive(Debug, Clone, Default)]
pub struct TransformReport {
    pub root: PathBuf,
    pub files_scanned: usize,
    /// Worker modules known to the run, sorted.
    pub workers: Vec<PathBuf>,
    /// Owners whose text changed (written, or would be in a dry run).
    pub transformed: Vec<PathBuf>,
    /// Owners with matches whose text stayed identical.
    pub unchanged: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    pub dry_run: bool,
}

impl TransformReport {
    pub fn is_noop(&self) -> bool {
        self.transformed.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// `path` relative to the run root, for display.
    pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Output of the scan phase.
struct ScanPhase {
    root: PathBuf,
    files: Vec<ScannedFile>,
    files_scanned: usize,
    declared_workers: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl ScanPhase {
    fn resolved_targets(&self) -> IndexSet<PathBuf> {
        self.files
            .iter()
            .flat_map(|f| f.references.iter().map(|r| r.resolved_path()))
            .collect()
    }

    /// Texts already read by the scan, keyed by path.
    fn scanned_texts(&self) -> HashMap<&Path, &str> {
        self.files
            .iter()
            .map(|f| (f.file.path.as_path(), f.file.text.as_str()))
            .collect()
    }

    /// Registry for every resolved target. Targets that were scanned as
    /// owners reuse that text instead of being read a second time.
    fn build_registry(&self, store: &dyn SourceStore) -> WorkerRegistry {
        WorkerRegistry::build_seeded(self.resolved_targets(), &self.scanned_texts(), store)
    }

    fn workers(&self, registry: &WorkerRegistry) -> Vec<PathBuf> {
        let mut workers: IndexSet<PathBuf> = self.declared_workers.iter().cloned().collect();
        workers.extend(registry.worker_paths());
        let mut workers: Vec<PathBuf> = workers.into_iter().collect();
        workers.sort();
        workers
    }
}

/// Drives a whole run over a source root.
pub struct Transformer {
    config: TransformConfig,
    classifier: Arc<dyn WorkerClassifier>,
    store: Arc<dyn SourceStore>,
}

impl Transformer {
    pub fn new(config: TransformConfig) -> Result<Self> {
        config.validate()?;
        let classifier = classifier_for(&config);
        Ok(Self {
            config,
            classifier,
            store: Arc::new(FsStore),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn SourceStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn WorkerClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Batch mode: rewrites every owner under `root` in place.
    pub fn run(&self, root: &Path) -> Result<TransformReport> {
        let pool = self.pool()?;
        pool.install(|| self.run_in_pool(root))
    }

    /// Embedded mode, first half: scans `root` and populates the registry
    /// without rewriting anything.
    pub fn prepare(&self, root: &Path) -> Result<PreparedTransform> {
        let pool = self.pool()?;
        pool.install(|| -> Result<PreparedTransform> {
            let scan = self.scan_phase(root)?;
            let registry = scan.build_registry(self.store.as_ref());
            let workers = scan.workers(&registry);
            Ok(PreparedTransform {
                root: scan.root,
                classifier: self.classifier.clone(),
                registry,
                workers,
                files_scanned: scan.files_scanned,
                diagnostics: scan.diagnostics,
            })
        })
    }

    fn pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = self.config.jobs {
            builder = builder.num_threads(jobs);
        }
        Ok(builder.build()?)
    }

    fn run_in_pool(&self, root: &Path) -> Result<TransformReport> {
        let scan = self.scan_phase(root)?;

        let registry = scan.build_registry(self.store.as_ref());
        debug!(
            "Registry built: {} worker paths, {} readable",
            registry.len(),
            registry.available()
        );

        let mut report = TransformReport {
            root: scan.root.clone(),
            files_scanned: scan.files_scanned,
            workers: scan.workers(&registry),
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        report.diagnostics.extend(scan.diagnostics.iter().cloned());

        // Barrier passed: the registry is complete and read-only from here on.
        let rewriter = SourceRewriter::new(&registry);
        let outcomes: Vec<(&ScannedFile, RewriteOutcome)> = scan
            .files
            .par_iter()
            .filter(|f| !f.references.is_empty())
            .map(|f| (f, rewriter.rewrite(&f.file, &f.references)))
            .collect();

        for (scanned, outcome) in outcomes {
            let path = scanned.file.path.clone();
            report.diagnostics.extend(outcome.diagnostics);

            let state = match outcome.rewrite {
                None => FileState::Unchanged,
                Some(_) if self.config.dry_run => FileState::Rewritten,
                Some(rewrite) => match self.store.write(&rewrite.owner_path, &rewrite.new_text) {
                    Ok(()) => FileState::Written,
                    Err(e) => {
                        let diagnostic = Diagnostic {
                            owner: path.clone(),
                            target: None,
                            kind: DiagnosticKind::WriteFailed(e.to_string()),
                        };
                        error!("{}", diagnostic);
                        report.diagnostics.push(diagnostic);
                        FileState::WriteFailed
                    }
                },
            };
            debug!("{} -> {:?}", path.display(), state);

            match state {
                FileState::Written | FileState::Rewritten => {
                    report.transformed.push(path);
                }
                FileState::Unchanged => report.unchanged.push(path),
                FileState::WriteFailed => {}
            }
        }

        info!(
            "Run complete: {} scanned, {} workers, {} transformed",
            report.files_scanned,
            report.workers.len(),
            report.transformed.len()
        );
        Ok(report)
    }

    fn scan_phase(&self, root: &Path) -> Result<ScanPhase> {
        let root = absolutize(root)?;
        let paths = FileCollector::new(&root).collect_paths()?;
        debug!("Collected {} files under {}", paths.len(), root.display());

        let declared_workers = self.classifier.declared_workers(&paths);
        let targets: Vec<&PathBuf> = paths
            .iter()
            .filter(|p| self.classifier.is_scan_target(p))
            .collect();

        let scanner = ReferenceScanner::new(self.classifier.as_ref());
        let results: Vec<std::result::Result<ScannedFile, Diagnostic>> = targets
            .par_iter()
            .map(|path| match self.store.read_to_string(path) {
                Ok(text) => {
                    let references = scanner.scan(path, &text);
                    Ok(ScannedFile {
                        file: SourceFile {
                            path: (*path).clone(),
                            text,
                        },
                        references,
                    })
                }
                Err(e) => Err(Diagnostic {
                    owner: (*path).clone(),
                    target: None,
                    kind: DiagnosticKind::SourceUnreadable(e.to_string()),
                }),
            })
            .collect();

        let mut files = Vec::with_capacity(results.len());
        let mut diagnostics = Vec::new();
        for result in results {
            match result {
                Ok(file) => files.push(file),
                Err(diagnostic) => {
                    warn!("{}", diagnostic);
                    diagnostics.push(diagnostic);
                }
            }
        }

        let references: usize = files.iter().map(|f| f.references.len()).sum();
        debug!(
            "Scanned {} files with the {} strategy, {} worker references",
            targets.len(),
            self.classifier.name(),
            references
        );

        Ok(ScanPhase {
            root,
            files,
            files_scanned: targets.len(),
            declared_workers,
            diagnostics,
        })
    }
}

/// A populated, read-only registry for transforming single files on demand.
pub struct PreparedTransform {
    root: PathBuf,
    classifier: Arc<dyn WorkerClassifier>,
    registry: WorkerRegistry,
    workers: Vec<PathBuf>,
    files_scanned: usize,
    diagnostics: Vec<Diagnostic>,
}

impl PreparedTransform {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workers(&self) -> &[PathBuf] {
        &self.workers
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    /// Problems met while preparing (unreadable sources).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Transforms one file's text. `path` locates the file so relative worker
    /// literals resolve; the text itself is taken as given. Files the
    /// classifier does not treat as owners pass through untouched.
    pub fn transform_source(&self, path: &Path, text: &str) -> Result<RewriteOutcome> {
        let path = absolutize(path)?;
        if !self.classifier.is_scan_target(&path) {
            debug!("{} is not a scan target, passing through", path.display());
            return Ok(RewriteOutcome::default());
        }

        let references = ReferenceScanner::new(self.classifier.as_ref()).scan(&path, text);
        let file = SourceFile {
            path,
            text: text.to_string(),
        };
        Ok(SourceRewriter::new(&self.registry).rewrite(&file, &references))
    }
}
