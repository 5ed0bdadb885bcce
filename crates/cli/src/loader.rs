use pochade_core::Transformer;
use pochade_core::config::TransformConfig;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::debug;

/// Prints `file`'s transformed text; the original text when nothing applies.
pub fn run(
    file: PathBuf,
    root: PathBuf,
    from_stdin: bool,
    config: TransformConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = if from_stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&file)?
    };

    let prepared = Transformer::new(config)?.prepare(&root)?;
    debug!(
        "Registry ready for {}: {} worker(s) from {} scanned file(s), {} warning(s)",
        prepared.root().display(),
        prepared.workers().len(),
        prepared.files_scanned(),
        prepared.diagnostics().len()
    );

    let outcome = prepared.transform_source(&file, &text)?;
    let output = match &outcome.rewrite {
        Some(rewrite) => rewrite.new_text.as_str(),
        None => text.as_str(),
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
