use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covgate::cli::{self, Style};

/// covgate: check Istanbul coverage against per-path, per-glob and global thresholds.
#[derive(Parser)]
#[command(name = "covgate", version, about)]
struct Cli {
    /// Log classification details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check coverage against thresholds; exits non-zero when a check fails.
    Check {
        /// Istanbul `coverage-final.json` file.
        #[arg(long, default_value = "coverage/coverage-final.json")]
        coverage: PathBuf,

        /// Threshold file (group map, `coverageThreshold` object, or package.json).
        #[arg(long)]
        thresholds: PathBuf,

        /// Directory that relative group specifiers are resolved against
        /// (default: current directory).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output style.
        #[arg(long, value_enum, default_value = "text")]
        style: Style,
    },

    /// Show coverage per file, or per threshold group when thresholds are given.
    Summary {
        /// Istanbul `coverage-final.json` file.
        #[arg(long, default_value = "coverage/coverage-final.json")]
        coverage: PathBuf,

        /// Threshold file to group the summary by.
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Directory that relative group specifiers are resolved against.
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "covgate=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Group specifiers are matched against absolute coverage paths, so the
/// root must be absolute too.
fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    Ok(match root {
        Some(root) if root.is_relative() => cwd.join(root),
        Some(root) => root,
        None => cwd,
    })
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Check {
            coverage,
            thresholds,
            root,
            style,
        } => {
            let root = resolve_root(root)?;
            let outcome = cli::cmd_check(&coverage, &thresholds, &root, style)?;
            print!("{}", outcome.output);
            Ok(if outcome.passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Summary {
            coverage,
            thresholds,
            root,
        } => {
            let root = resolve_root(root)?;
            print!("{}", cli::cmd_summary(&coverage, thresholds.as_deref(), &root)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
