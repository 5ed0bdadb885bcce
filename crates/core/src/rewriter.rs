use crate::model::{Diagnostic, DiagnosticKind, Rewrite, SourceFile, WorkerReference};
use crate::registry::{WorkerMiss, WorkerRegistry};
use std::ops::Range;
use tracing::warn;

/// Escapes `text` for use between backticks of a JS template literal.
///
/// One pass over the input, so every backslash, backtick and `$` is escaped
/// exactly once and no escape introduced here is escaped again. Carriage
/// returns become `\r`, since template literals normalize raw CRLF to LF.
///
/// The `k` of every `Worker` is written as `\k`, which cooks back to `k`.
/// Embedded text therefore never contains the worker idiom, and a later run
/// over the rewritten owner finds nothing to replace.
pub fn escape_template_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    for (i, c) in text.char_indices() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '\r' => out.push_str("\\r"),
            'k' if text[..i].ends_with("Wor") && text[i..].starts_with("ker") => {
                out.push_str("\\k")
            }
            _ => out.push(c),
        }
    }
    out
}

/// Self-invoking expression that builds a worker from `worker_source` via a
/// short-lived blob URL.
pub fn inline_worker_expression(worker_source: &str) -> String {
    let escaped = escape_template_literal(worker_source);
    format!(
        "(function() {{
    const __workerCode = `{escaped}`;
    const blob = new Blob([__workerCode], {{ type: 'application/javascript' }});
    const url = URL.createObjectURL(blob);
    const worker = new Worker(url);
    URL.revokeObjectURL(url);
    return worker;
  }})()"
    )
}

#[derive(Debug, Default)]
pub struct RewriteOutcome {
    /// Present only when the new text differs from the original.
    pub rewrite: Option<Rewrite>,
    pub replaced: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Replaces worker references with inline constructions, reading worker
/// sources from a frozen registry.
pub struct SourceRewriter<'a> {
    registry: &'a WorkerRegistry,
}

impl<'a> SourceRewriter<'a> {
    pub fn new(registry: &'a WorkerRegistry) -> Self {
        Self { registry }
    }

    /// `references` must come from scanning `file.text`, in source order.
    pub fn rewrite(&self, file: &SourceFile, references: &[WorkerReference]) -> RewriteOutcome {
        let mut outcome = RewriteOutcome::default();
        if references.is_empty() {
            return outcome;
        }

        let text = file.text.as_str();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for reference in references {
            let Some(span) = locate(text, cursor, reference) else {
                continue;
            };

            let resolved = reference.resolved_path();
            match self.registry.lookup(&resolved) {
                Ok(module) => {
                    out.push_str(&text[cursor..span.start]);
                    out.push_str(&inline_worker_expression(&module.text));
                    cursor = span.end;
                    outcome.replaced += 1;
                }
                Err(miss) => {
                    let kind = match miss {
                        WorkerMiss::NotFound => DiagnosticKind::WorkerNotFound,
                        WorkerMiss::Unreadable(reason) => DiagnosticKind::WorkerUnreadable(reason),
                    };
                    let diagnostic = Diagnostic {
                        owner: file.path.clone(),
                        target: Some(resolved),
                        kind,
                    };
                    warn!("{}", diagnostic);
                    outcome.diagnostics.push(diagnostic);
                }
            }
        }

        if outcome.replaced > 0 {
            out.push_str(&text[cursor..]);
            if out != text {
                outcome.rewrite = Some(Rewrite {
                    owner_path: file.path.clone(),
                    new_text: out,
                });
            }
        }

        outcome
    }
}

/// Byte range of `reference` in `text`, at or after `from`. Uses the recorded
/// span when it still matches, else the first occurrence of the matched text.
fn locate(text: &str, from: usize, reference: &WorkerReference) -> Option<Range<usize>> {
    let span = reference.span.clone();
    if span.start >= from && text.get(span.clone()) == Some(reference.matched_text.as_str()) {
        return Some(span);
    }
    let start = from + text.get(from..)?.find(&reference.matched_text)?;
    Some(start..start + reference.matched_text.len())
}
