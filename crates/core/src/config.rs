//! Run configuration: which discovery strategy to use, which files count as
//! sources, and how much parallelism to allow.
//!
//! Configuration is plain JSON, e.g.
//!
//! ```json
//! { "strategy": "naming", "extensions": ["js", "mjs"], "markers": [".worker.js"] }
//! ```

use crate::error::{Result, TransformError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "pochade-workers.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Workers are whatever the scanned sources point at.
    #[default]
    Reference,
    /// Workers are files whose name ends with a configured marker.
    Naming,
}

impl std::str::FromStr for Strategy {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reference" => Ok(Strategy::Reference),
            "naming" => Ok(Strategy::Naming),
            other => Err(TransformError::Config(format!(
                "unknown strategy '{}' (expected 'reference' or 'naming')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Reference => write!(f, "reference"),
            Strategy::Naming => write!(f, "naming"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub strategy: Strategy,
    /// Extensions (without the dot) of files scanned as potential owners.
    pub extensions: Vec<String>,
    /// File name suffixes marking worker modules under the naming strategy.
    pub markers: Vec<String>,
    /// Worker threads for the scan and registry phases. `None` lets rayon decide.
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            extensions: vec!["js".to_string()],
            markers: vec![".worker.js".to_string()],
            jobs: None,
            dry_run: false,
        }
    }
}

impl TransformConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise `pochade-workers.json` next to the
    /// source root (in its parent directory) when present, otherwise defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        if let Some(candidate) = Self::default_location(root) {
            if candidate.is_file() {
                tracing::debug!("Loading configuration from {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn default_location(root: &Path) -> Option<PathBuf> {
        let parent = root.parent()?;
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        Some(parent.join(DEFAULT_CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(TransformError::Config(
                "at least one source extension is required".to_string(),
            ));
        }
        if self.strategy == Strategy::Naming && self.markers.iter().all(|m| m.is_empty()) {
            return Err(TransformError::Config(
                "the naming strategy needs at least one worker marker".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(TransformError::Config("jobs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Extension match tolerant of a leading dot in the configured value.
pub(crate) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|e| e.trim_start_matches('.') == ext))
        .unwrap_or(false)
}
