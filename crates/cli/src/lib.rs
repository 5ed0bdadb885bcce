mod loader;
mod transform;

use clap::{Args, Parser, Subcommand};
use pochade_core::config::{Strategy, TransformConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pochade-workers",
    version,
    about = "Inline web worker sources so an app ships as a single bundle",
    long_about = "Finds `new Worker(new URL('./file.js', import.meta.url))` expressions and replaces \
                  each one with a self-contained construction that embeds the worker's source and \
                  starts it from a blob URL. Runs as a pre-build pass over a source tree, or as a \
                  per-file loader step inside a bundler pipeline."
)]
pub struct Cli {
    /// Also write logs to daily rolling files in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite worker references in place under a source root
    #[command(
        long_about = "Scans every source file under the root, reads each referenced worker once, \
                            and rewrites owners in place. Unresolvable references are reported and \
                            left untouched."
    )]
    Transform {
        /// Source root to process
        #[arg(value_name = "ROOT", default_value = "src")]
        root: PathBuf,

        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        options: ConfigArgs,
    },
    /// Transform one file and print the result to stdout
    #[command(
        long_about = "Prepares the worker registry from the source root, then transforms a single \
                            file and writes the new text to stdout. The file's text is read from disk, \
                            or from stdin with --stdin."
    )]
    Loader {
        /// Path of the file being transformed
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Source root used to populate the registry
        #[arg(long, value_name = "ROOT", default_value = "src")]
        root: PathBuf,

        /// Read the file's text from stdin instead of from disk
        #[arg(long)]
        stdin: bool,

        #[command(flatten)]
        options: ConfigArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON configuration file (default: pochade-workers.json beside the root)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How worker modules are recognised: reference or naming
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,

    /// Source extension to scan; repeat for several
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Worker file name suffix for the naming strategy; repeat for several
    #[arg(long = "marker", value_name = "SUFFIX")]
    pub markers: Vec<String>,

    /// Threads for scanning and reading workers
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl ConfigArgs {
    /// File (or default) configuration with command-line values layered on top.
    pub fn resolve(&self, root: &Path) -> pochade_core::Result<TransformConfig> {
        let mut config = TransformConfig::discover(root, self.config.as_deref())?;
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if !self.markers.is_empty() {
            config.markers = self.markers.clone();
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Transform { .. } => "transform",
        Commands::Loader { .. } => "loader",
    };
    let _guard = pochade_core::logging::init_logging(component, cli.log_dir.as_deref());

    match cli.command {
        Commands::Transform {
            root,
            dry_run,
            options,
        } => {
            let mut config = options.resolve(&root)?;
            config.dry_run |= dry_run;
            transform::run(root, config)
        }
        Commands::Loader {
            file,
            root,
            stdin,
            options,
        } => {
            let config = options.resolve(&root)?;
            loader::run(file, root, stdin, config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parses_transform_flags() {
        let cli = Cli::try_parse_from([
            "pochade-workers",
            "transform",
            "web/src",
            "--dry-run",
            "--strategy",
            "naming",
            "--marker",
            ".worker.js",
            "--marker",
            "-webworker.js",
            "-j",
            "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Transform {
                root,
                dry_run,
                options,
            } => {
                assert_eq!(root, PathBuf::from("web/src"));
                assert!(dry_run);
                assert_eq!(options.strategy, Some(Strategy::Naming));
                assert_eq!(options.markers.len(), 2);
                assert_eq!(options.jobs, Some(4));
            }
            _ => panic!("expected transform"),
        }
    }

    #[test]
    fn test_transform_root_defaults_to_src() {
        let cli = Cli::try_parse_from(["pochade-workers", "transform"]).unwrap();
        match cli.command {
            Commands::Transform { root, .. } => assert_eq!(root, PathBuf::from("src")),
            _ => panic!("expected transform"),
        }
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let parsed = Cli::try_parse_from(["pochade-workers", "transform", "--strategy", "suffix"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(
            dir.path().join("pochade-workers.json"),
            r#"{ "strategy": "naming", "extensions": ["mjs"] }"#,
        )
        .unwrap();

        let args = ConfigArgs {
            strategy: Some(Strategy::Reference),
            ..Default::default()
        };
        let config = args.resolve(&root).unwrap();

        assert_eq!(config.strategy, Strategy::Reference);
        assert_eq!(config.extensions, vec!["mjs".to_string()]);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let dir = tempdir().unwrap();
        let args = ConfigArgs {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(args.resolve(dir.path()).is_err());
    }
}
