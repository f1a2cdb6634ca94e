//! Command-line driver for the pyscope analyzer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pyscope_core::{Analyzer, AnalyzerOptions, Severity};

#[derive(Parser)]
#[command(name = "pyscope", about = "Whole-program type inference for Python sources", version)]
struct Cli {
    /// File or directory to analyze.
    path: PathBuf,

    /// Suppress the end-of-run summary.
    #[arg(long)]
    quiet: bool,

    /// Verbose logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when any error-severity diagnostic was reported.
fn run(cli: &Cli) -> Result<bool> {
    let options = AnalyzerOptions {
        quiet: cli.quiet,
        debug: cli.debug,
    };
    let mut analyzer = Analyzer::new(options)?;

    let path = cli.path.to_string_lossy();
    analyzer.analyze(&path).with_context(|| format!("failed to analyze {path}"))?;
    analyzer.finish();

    let mut has_errors = false;
    let files: Vec<String> = analyzer
        .loaded_files()
        .iter()
        .chain(analyzer.failed_to_parse().iter())
        .cloned()
        .collect();
    for file in files {
        for diagnostic in analyzer.get_diagnostics_for_file(&file) {
            if diagnostic.severity == Severity::Error {
                has_errors = true;
            }
            println!("{diagnostic}");
        }
    }

    if !cli.quiet {
        println!("{}", analyzer.analysis_summary());
    }

    analyzer.close()?;
    Ok(!has_errors)
}
