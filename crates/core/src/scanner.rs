use crate::classifier::WorkerClassifier;
use crate::model::WorkerReference;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `new Worker(new URL('<literal>', import.meta.url))`, either quote style,
/// whitespace (newlines included) allowed between tokens. The regex crate has
/// no backreferences, so matching quotes are spelled out as two alternatives.
static WORKER_IDIOM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"new\s+Worker\s*\(\s*new\s+URL\s*\(\s*(?:'(?P<single>[^'\r\n]+)'|"(?P<double>[^"\r\n]+)")\s*,\s*import\.meta\.url\s*\)\s*\)"#,
    )
    .expect("worker idiom pattern is valid")
});

/// Finds worker references in source text.
///
/// Text-level matching: an idiom inside a comment or a string literal is
/// found like any other.
pub struct ReferenceScanner<'a> {
    classifier: &'a dyn WorkerClassifier,
}

impl<'a> ReferenceScanner<'a> {
    pub fn new(classifier: &'a dyn WorkerClassifier) -> Self {
        Self { classifier }
    }

    /// All accepted references in `text`, in source order.
    pub fn scan(&self, owner: &Path, text: &str) -> Vec<WorkerReference> {
        find_references(owner, text)
            .into_iter()
            .filter(|r| self.classifier.accepts_reference(&r.literal_path))
            .collect()
    }
}

/// Every idiom occurrence in `text`, regardless of classification.
pub fn find_references(owner: &Path, text: &str) -> Vec<WorkerReference> {
    WORKER_IDIOM
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let literal = caps.name("single").or_else(|| caps.name("double"))?;
            Some(WorkerReference {
                owner_path: owner.to_path_buf(),
                matched_text: whole.as_str().to_string(),
                literal_path: literal.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}
