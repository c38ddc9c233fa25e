//! CLI command implementations.

use super::printer::ConsolePrinter;
use super::report::Report;
use super::{OutputFormat, RunArgs};
use crate::checks::{self, disabled_reason, Selection};
use crate::config::{Config, RunnerConfig, CONFIG_FILE_NAME};
use crate::core::check::RunResult;
use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::printer::{NullPrinter, Printer};
use crate::core::runner::{Runner, RunnerOptions};
use crate::presets;
use console::style;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

/// Exit status after Ctrl-C.
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Loads the configuration named on the command line, or searches for one.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load_or_default(),
    }
}

/// Resolves execution settings from flags over `[runner]`.
///
/// `--sequential` wins over everything; otherwise any worker limit, from the
/// command line or the config, implies a parallel run.
fn runner_options(args: &RunArgs, runner: &RunnerConfig, category: &str) -> RunnerOptions {
    let mut options = RunnerOptions::default().category(category);
    if args.fail_fast || runner.fail_fast {
        options = options.fail_fast();
    }
    if args.sequential {
        return options;
    }

    match args.workers {
        Some(workers) => options.workers(workers),
        None if runner.workers > 0 => options.workers(runner.workers),
        None if args.parallel || runner.parallel => options.parallel(),
        None => options,
    }
}

/// Cancels `ctx` on Ctrl-C.
///
/// The handler is registered before this returns, so an interrupt that
/// arrives while the first check starts is not missed.
fn cancel_on_interrupt(ctx: &Context) -> Result<tokio::task::JoinHandle<()>> {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .map_err(|e| Error::io("install interrupt handler", e))?;

    let ctx = ctx.clone();
    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let received = interrupt.recv().await.is_some();
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await.is_ok();

        if received {
            tracing::warn!("interrupted, cancelling checks");
            ctx.cancel();
        }
    }))
}

/// Runs `fut` with panic messages sent to the debug log.
///
/// The runner recovers check panics and reports them as failures, but the
/// default hook would still print a trace in the middle of the check output.
/// The previous hook is restored once `fut` completes.
async fn with_quiet_panics<F: Future>(fut: F) -> F::Output {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(%info, "recovered panic");
    }));

    let output = fut.await;

    std::panic::set_hook(previous);
    output
}

/// Run checks.
pub async fn run(config_path: Option<&Path>, args: &RunArgs) -> Result<ExitCode> {
    // Check for skip
    if std::env::var("CHECKRUN_SKIP").ok().as_deref() == Some("1") {
        eprintln!("{} Skipping checks (CHECKRUN_SKIP=1)", style("•").cyan());
        return Ok(ExitCode::SUCCESS);
    }

    let started_at = chrono::Local::now();
    let start = Instant::now();

    let config = load_config(config_path)?;
    let selection = Selection {
        categories: args.categories.clone(),
        checks: args.checks.clone(),
    };
    let plans = checks::plan(&config, &selection)?;

    if plans.is_empty() {
        eprintln!("{} No checks configured", style("!").yellow());
        return Ok(ExitCode::SUCCESS);
    }

    let console = Arc::new(ConsolePrinter::stderr());
    let printer: Arc<dyn Printer> = match args.format {
        OutputFormat::Text => console.clone(),
        OutputFormat::Json => Arc::new(NullPrinter),
    };

    let ctx = Context::new();
    let interrupt = cancel_on_interrupt(&ctx)?;

    let mut report = Report::new(started_at);
    let mut success = true;

    for plan in plans {
        if ctx.is_cancelled() {
            break;
        }

        let options = runner_options(args, &config.runner, &plan.name);
        let fail_fast = options.fail_fast;
        let runner = Runner::new(Arc::clone(&printer), options);
        for check in plan.checks {
            runner.add(check);
        }

        let result = if runner.is_empty() {
            RunResult::default()
        } else {
            with_quiet_panics(runner.run(&ctx)).await
        };

        if args.format == OutputFormat::Text {
            if runner.is_empty() {
                console.category_header(&plan.name);
            }
            for disabled in &plan.disabled {
                console.check_skipped(&disabled.name, &disabled.reason);
            }
        }

        report.add_category(&plan.name, &result, &plan.disabled);

        if !result.success() {
            success = false;
            if fail_fast {
                tracing::debug!(category = %plan.name, "fail-fast: skipping remaining categories");
                break;
            }
        }
    }

    interrupt.abort();

    let interrupted = ctx.is_cancelled();
    report.finish(start.elapsed(), interrupted);

    if args.format == OutputFormat::Json {
        let json = report.to_json()?;
        writeln!(std::io::stdout(), "{json}").map_err(|e| Error::io("write report", e))?;
    }

    if interrupted {
        eprintln!("{} Interrupted", style("!").yellow());
        return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
    }

    if success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// List configured checks.
pub fn list(config_path: Option<&Path>, category: Option<&str>) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let root = config.root()?;
    let categories = config.categories();

    if let Some(name) = category {
        if !categories.contains(&name) {
            return Err(Error::CategoryNotFound {
                name: name.to_string(),
            });
        }
    }

    for name in categories {
        if category.is_some_and(|c| c != name) {
            continue;
        }

        eprintln!("{}", style(name).bold());
        for check in config.checks_in(name) {
            let description = if check.description.is_empty() {
                "(no description)"
            } else {
                check.description.as_str()
            };

            match disabled_reason(check, &root) {
                None => eprintln!("  {} - {}", style(&check.name).cyan(), description),
                Some(reason) => eprintln!(
                    "  {} - {} {}",
                    style(&check.name).dim(),
                    description,
                    style(format!("(disabled: {reason})")).dim()
                ),
            }
        }
        eprintln!();
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize configuration.
pub fn init(config_path: Option<&Path>, preset: Option<&str>, force: bool) -> Result<ExitCode> {
    let config_path = config_path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);

    // Check if config already exists
    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    let config = match preset {
        Some(p) => Config::for_preset(p)?,
        None => Config::default(),
    };

    let toml = toml::to_string_pretty(&config).map_err(|e| Error::Internal {
        message: format!("Failed to serialize config: {e}"),
    })?;

    std::fs::write(&config_path, toml).map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());

    if let Some(p) = preset {
        eprintln!("  Using preset: {p} - {}", presets::description(p));
    }

    eprintln!("\nNext steps:");
    eprintln!("  1. Review and customize {}", config_path.display());
    eprintln!("  2. Run: checkrun");

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
pub fn validate(config_path: Option<&Path>) -> Result<ExitCode> {
    let loaded = match config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match loaded {
        Ok(config) => {
            eprintln!(
                "{} Configuration is valid ({} checks in {} categories)",
                style("✓").green(),
                config.checks.len(),
                config.categories().len()
            );
            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Run: checkrun init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => {
            eprintln!("{} Configuration validation failed: {e}", style("✗").red());
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Show configuration.
pub fn config(config_path: Option<&Path>, raw: bool) -> Result<ExitCode> {
    let found = match config_path {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        }),
        None => Config::find_config_file(),
    };

    match found {
        Ok(path) => {
            eprintln!("Configuration file: {}", path.display());

            if raw {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io("read config", e))?;
                eprintln!();
                std::io::stdout()
                    .write_all(content.as_bytes())
                    .map_err(|e| Error::io("write output", e))?;
            }

            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { .. }) => {
            eprintln!("{} No configuration file found", style("!").yellow());
            eprintln!("  Run: checkrun init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => Err(e),
    }
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "checkrun",
        &mut std::io::stdout(),
    );
}
