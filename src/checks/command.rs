//! Checks backed by shell commands.

use crate::config::{parse_timeout, CheckConfig};
use crate::core::check::Check;
use crate::core::context::{CancelReason, Context};
use crate::core::error::{BoxError, CheckError, Error, Result};
use crate::core::executor::{ExecuteOptions, Executor};
use std::path::PathBuf;
use std::time::Duration;

/// Lines of command output kept in a failure message.
const OUTPUT_TAIL_LINES: usize = 20;

/// Exit status `sh` reports when the command itself doesn't exist.
const SHELL_COMMAND_NOT_FOUND: i32 = 127;

/// Settings applied to every command check unless the check overrides them.
#[derive(Debug, Clone)]
pub struct CommandDefaults {
    /// Working directory for commands.
    pub root: PathBuf,
    /// Timeout for checks without their own.
    pub timeout: Duration,
    /// Shell override.
    pub shell: Option<String>,
}

/// Builds a runnable check from its configuration.
pub fn command_check(config: &CheckConfig, defaults: &CommandDefaults) -> Result<Check> {
    let timeout = match config.timeout {
        Some(ref value) => parse_timeout(&format!("checks.{}.timeout", config.name), value)?,
        None => defaults.timeout,
    };

    let mut options = ExecuteOptions::default()
        .cwd(&defaults.root)
        .timeout(timeout);
    if let Some(ref shell) = defaults.shell {
        options = options.shell(shell.clone());
    }
    for (key, value) in &config.env {
        options = options.env(key.clone(), value.clone());
    }

    let job = ShellJob {
        name: config.name.clone(),
        command: config.run.clone(),
        timeout: humantime::format_duration(timeout).to_string(),
        options,
    };

    let check = Check::new(config.name.clone(), move |ctx: Context| {
        let job = job.clone();
        async move { job.run(ctx).await }
    })
    .with_remediation(config.remediation.clone())
    .with_details(config.details.clone());

    Ok(check)
}

#[derive(Debug, Clone)]
struct ShellJob {
    name: String,
    command: String,
    timeout: String,
    options: ExecuteOptions,
}

impl ShellJob {
    async fn run(self, ctx: Context) -> std::result::Result<(), BoxError> {
        // Dropping the execute future kills the child process.
        let executor = Executor::new();
        let output = tokio::select! {
            output = executor.execute(&self.command, self.options.clone()) => output?,
            () = ctx.cancelled() => {
                let reason = ctx.err().unwrap_or(CancelReason::Cancelled);
                tracing::debug!(check = %self.name, %reason, "command cancelled");
                return Err(CheckError::Cancelled(reason).into());
            },
        };

        if output.timed_out {
            return Err(Error::CheckTimeout {
                name: self.name,
                timeout: self.timeout,
            }
            .into());
        }

        if output.exit_code == SHELL_COMMAND_NOT_FOUND && cfg!(unix) {
            let program = self.command.split_whitespace().next().unwrap_or_default();
            if !Executor::command_exists(program) {
                return Err(Error::CommandNotFound {
                    command: program.to_string(),
                }
                .into());
            }
        }

        if !output.success() {
            let mut message = output.tail(OUTPUT_TAIL_LINES);
            if message.is_empty() {
                message = format!("exit code {}", output.exit_code);
            }
            return Err(Error::check_failed(self.name, message, Some(output.exit_code)).into());
        }

        Ok(())
    }
}
