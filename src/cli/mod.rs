//! Command-line interface for checkrun.
//!
//! This module provides the `checkrun` CLI with subcommands for:
//! - `run`: Run configured checks (the default)
//! - `list`: List configured checks
//! - `init`: Initialize configuration
//! - `validate`: Validate configuration
//! - `config`: Show the configuration file
//! - `completions`: Generate shell completions

mod commands;
mod printer;
mod report;

pub use printer::ConsolePrinter;
pub use report::Report;

use crate::core::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run named checks by category, sequentially or in parallel.
#[derive(Debug, Parser)]
#[command(
    name = "checkrun",
    author,
    version,
    about = "Run named checks by category, sequentially or in parallel",
    long_about = r#"
checkrun runs the checks defined in checkrun.toml, grouped by category.
Checks in a category run on a bounded worker pool (or one at a time with
--sequential) and are always reported in configuration order.

Quick start:
  checkrun init --preset rust   # Create configuration
  checkrun                      # Run every category
  checkrun run -C lint          # Run one category

Environment variables:
  CHECKRUN_CONFIG=PATH   Use a specific configuration file
  CHECKRUN_SKIP=1        Skip all checks
  RUST_LOG=debug         Override log filtering
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the configuration file.
    #[arg(long, global = true, env = "CHECKRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Output format for `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress on stderr.
    #[default]
    Text,
    /// A JSON report on stdout.
    Json,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run configured checks.
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// List all configured checks.
    #[command(visible_alias = "l")]
    List {
        /// Show checks for a specific category.
        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    /// Initialize checkrun configuration.
    #[command(visible_alias = "i")]
    Init {
        /// Use a preset configuration.
        #[arg(short, long, value_parser = ["python", "node", "rust", "go"])]
        preset: Option<String>,

        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration file.
    #[command(visible_alias = "v")]
    Validate,

    /// Show configuration file location and contents.
    Config {
        /// Output raw TOML.
        #[arg(long)]
        raw: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Arguments for `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RunArgs {
    /// Run only this category (repeatable).
    #[arg(short = 'C', long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Run only this check (repeatable).
    #[arg(short, long = "check", value_name = "NAME")]
    pub checks: Vec<String>,

    /// Run checks of a category concurrently.
    #[arg(long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Run checks one at a time.
    #[arg(long)]
    pub sequential: bool,

    /// Maximum concurrent checks (0 = one per check).
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Stop after the first failing check.
    #[arg(long)]
    pub fail_fast: bool,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Runs the CLI.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    setup_logging(cli.verbose, cli.quiet);

    // Set up color
    setup_color(cli.color);

    let config = cli.config.as_deref();

    // If no subcommand, run the default action (same as `checkrun run`)
    match cli.command {
        Some(Commands::Run(args)) => commands::run(config, &args).await,
        Some(Commands::List { category }) => commands::list(config, category.as_deref()),
        Some(Commands::Init { preset, force }) => commands::init(config, preset.as_deref(), force),
        Some(Commands::Validate) => commands::validate(config),
        Some(Commands::Config { raw }) => commands::config(config, raw),
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
        None => commands::run(config, &RunArgs::default()).await,
    }
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
