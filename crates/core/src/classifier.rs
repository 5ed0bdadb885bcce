//! Worker classification strategies.
//!
//! The pipeline asks a classifier three things: which files to scan as
//! owners, which references to accept, and which paths are worker modules
//! before the scan has run. Everything else is strategy-agnostic.

use crate::config::{Strategy, TransformConfig, has_extension};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait WorkerClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `path` should be scanned for worker references.
    fn is_scan_target(&self, path: &Path) -> bool;

    /// Whether a reference whose literal reads `literal_path` is taken.
    fn accepts_reference(&self, literal_path: &str) -> bool;

    /// Workers known before any scan. Strategies that derive workers from
    /// references return nothing here.
    fn declared_workers(&self, _files: &[PathBuf]) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Builds the classifier selected by `config.strategy`.
pub fn classifier_for(config: &TransformConfig) -> Arc<dyn WorkerClassifier> {
    match config.strategy {
        Strategy::Reference => Arc::new(ReferenceDriven::new(config.extensions.clone())),
        Strategy::Naming => Arc::new(NamingConvention::new(
            config.extensions.clone(),
            config.markers.clone(),
        )),
    }
}

/// Any referenced file is a worker; every source file is an owner candidate.
pub struct ReferenceDriven {
    extensions: Vec<String>,
}

impl ReferenceDriven {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

impl WorkerClassifier for ReferenceDriven {
    fn name(&self) -> &str {
        "reference"
    }

    fn is_scan_target(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }

    fn accepts_reference(&self, _literal_path: &str) -> bool {
        true
    }
}

/// Workers are recognised by a file name suffix such as `.worker.js`.
pub struct NamingConvention {
    extensions: Vec<String>,
    markers: Vec<String>,
}

impl NamingConvention {
    pub fn new(extensions: Vec<String>, markers: Vec<String>) -> Self {
        let markers = markers.into_iter().filter(|m| !m.is_empty()).collect();
        Self {
            extensions,
            markers,
        }
    }

    pub fn is_worker(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| self.matches_marker(name))
            .unwrap_or(false)
    }

    fn matches_marker(&self, text: &str) -> bool {
        self.markers.iter().any(|m| text.ends_with(m.as_str()))
    }
}

impl WorkerClassifier for NamingConvention {
    fn name(&self) -> &str {
        "naming"
    }

    fn is_scan_target(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions) && !self.is_worker(path)
    }

    fn accepts_reference(&self, literal_path: &str) -> bool {
        self.matches_marker(literal_path)
    }

    fn declared_workers(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .filter(|p| self.is_worker(p))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js() -> Vec<String> {
        vec!["js".to_string()]
    }

    #[test]
    fn test_reference_driven_scans_every_source() {
        let c = ReferenceDriven::new(js());
        assert!(c.is_scan_target(Path::new("/src/main.js")));
        assert!(c.is_scan_target(Path::new("/src/calc.worker.js")));
        assert!(!c.is_scan_target(Path::new("/src/style.css")));
        assert!(c.accepts_reference("./anything.js"));
        assert!(c.declared_workers(&[PathBuf::from("/src/a.worker.js")]).is_empty());
    }

    #[test]
    fn test_naming_excludes_workers_from_scan() {
        let c = NamingConvention::new(js(), vec![".worker.js".to_string()]);
        assert!(c.is_scan_target(Path::new("/src/main.js")));
        assert!(!c.is_scan_target(Path::new("/src/calc.worker.js")));
    }

    #[test]
    fn test_naming_filters_references_by_marker() {
        let c = NamingConvention::new(js(), vec![".worker.js".to_string()]);
        assert!(c.accepts_reference("./calc.worker.js"));
        assert!(c.accepts_reference("../lib/calc.worker.js"));
        assert!(!c.accepts_reference("./calc.js"));
    }

    #[test]
    fn test_naming_declares_workers_up_front() {
        let c = NamingConvention::new(
            js(),
            vec![".worker.js".to_string(), "-webworker.js".to_string()],
        );
        let files = vec![
            PathBuf::from("/src/a.worker.js"),
            PathBuf::from("/src/main.js"),
            PathBuf::from("/src/example-webworker.js"),
        ];
        assert_eq!(
            c.declared_workers(&files),
            vec![
                PathBuf::from("/src/a.worker.js"),
                PathBuf::from("/src/example-webworker.js"),
            ]
        );
    }

    #[test]
    fn test_classifier_for_selects_strategy() {
        let config = TransformConfig {
            strategy: Strategy::Naming,
            ..Default::default()
        };
        assert_eq!(classifier_for(&config).name(), "naming");
        assert_eq!(classifier_for(&TransformConfig::default()).name(), "reference");
    }
}
