use nu_ansi_term::Color;
use pochade_core::config::TransformConfig;
use pochade_core::{TransformReport, Transformer};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;

pub fn run(root: PathBuf, config: TransformConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Transforming worker references under {} ({} strategy)",
        root.display(),
        config.strategy
    );

    let transformer = Transformer::new(config)?;
    let report = transformer.run(&root)?;

    print_report(&report);

    if report.has_errors() {
        let failed = report.diagnostics.iter().filter(|d| d.is_error()).count();
        return Err(format!("{} file(s) could not be written", failed).into());
    }
    Ok(())
}

fn print_report(report: &TransformReport) {
    let color = std::io::stdout().is_terminal();
    let paint = |c: Color, s: &str| {
        if color {
            c.paint(s).to_string()
        } else {
            s.to_string()
        }
    };

    println!("Scanned {} source file(s) for worker references", report.files_scanned);
    println!();
    println!("Found {} worker file(s):", report.workers.len());
    for worker in &report.workers {
        println!("  - {}", report.relative(worker).display());
    }
    println!();

    let verb = if report.dry_run {
        "Would transform"
    } else {
        "Transformed"
    };
    for path in &report.transformed {
        println!(
            "{} {}: {}",
            paint(Color::Green, "✓"),
            verb,
            report.relative(path).display()
        );
    }

    let warnings = report.warnings().count();
    if warnings > 0 {
        println!(
            "{} {} warning(s), see stderr",
            paint(Color::Yellow, "!"),
            warnings
        );
    }

    println!();
    if report.is_noop() {
        println!("No files needed transformation");
    } else if report.dry_run {
        println!(
            "{} file(s) would be transformed (dry run)",
            report.transformed.len()
        );
    } else {
        println!(
            "{} Successfully transformed {} file(s)",
            paint(Color::Green, "✓"),
            report.transformed.len()
        );
    }
}
