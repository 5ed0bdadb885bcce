use std::ops::Range;
use std::path::{Component, Path, PathBuf};

/// A source file as read during the scan phase.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// One occurrence of the worker instantiation idiom inside an owner file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReference {
    pub owner_path: PathBuf,
    /// Verbatim substring of the owner text; the replacement anchor.
    pub matched_text: String,
    /// The relative path exactly as written between the quotes.
    pub literal_path: String,
    /// Byte range of `matched_text` in the owner text.
    pub span: Range<usize>,
}

impl WorkerReference {
    /// Resolves the literal against the owner's directory.
    pub fn resolved_path(&self) -> PathBuf {
        let dir = self.owner_path.parent().unwrap_or_else(|| Path::new(""));
        normalize_path(&dir.join(&self.literal_path))
    }
}

/// A worker module's source, shared by every reference resolving to `resolved_path`.
#[derive(Debug, Clone)]
pub struct WorkerModule {
    pub resolved_path: PathBuf,
    pub text: String,
}

/// The fully rewritten body of an owner file.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub owner_path: PathBuf,
    pub new_text: String,
}

/// A scanned owner file together with the references found in it.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub file: SourceFile,
    pub references: Vec<WorkerReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A referenced worker module does not exist.
    WorkerNotFound,
    /// A referenced worker module exists but could not be read.
    WorkerUnreadable(String),
    /// An owner candidate could not be read during the scan.
    SourceUnreadable(String),
    /// The rewritten text could not be written back.
    WriteFailed(String),
}

/// A recoverable problem; recorded in the report, never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub owner: PathBuf,
    /// The worker path involved, when the problem concerns a reference.
    pub target: Option<PathBuf>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        matches!(self.kind, DiagnosticKind::WriteFailed(_))
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = self
            .target
            .as_deref()
            .map(|t| t.display().to_string())
            .unwrap_or_default();
        match &self.kind {
            DiagnosticKind::WorkerNotFound => write!(
                f,
                "Worker file not found: {} (referenced from {})",
                target,
                self.owner.display()
            ),
            DiagnosticKind::WorkerUnreadable(reason) => write!(
                f,
                "Could not read worker file {} (referenced from {}): {}",
                target,
                self.owner.display(),
                reason
            ),
            DiagnosticKind::SourceUnreadable(reason) => {
                write!(f, "Could not read {}: {}", self.owner.display(), reason)
            }
            DiagnosticKind::WriteFailed(reason) => {
                write!(f, "Could not write {}: {}", self.owner.display(), reason)
            }
        }
    }
}

/// Folds `.` and `..` components without touching the file system, so paths
/// that do not exist still normalize. `..` above the root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Makes `path` absolute against the current directory, then normalizes it.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}
