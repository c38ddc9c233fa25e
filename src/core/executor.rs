//! Shell command execution for configured checks.
//!
//! Commands run through `sh -c` (or `cmd /C` on Windows) with captured
//! output and an optional timeout. The child process is killed when the
//! returned future is dropped, which is how a cancelled check stops its
//! command.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Exit code reported for a command killed by its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Whether the command was killed due to timeout.
    pub timed_out: bool,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Returns combined stdout and stderr output.
    #[must_use]
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }

    /// Returns the last `n` lines of combined output.
    #[must_use]
    pub fn tail(&self, n: usize) -> String {
        let combined = self.combined_output();
        let lines: Vec<&str> = combined.lines().collect();
        lines[lines.len().saturating_sub(n)..].join("\n")
    }
}

/// Options for command execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Timeout for the command.
    pub timeout: Option<Duration>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
    /// Whether to capture output (vs streaming to console).
    pub capture_output: bool,
    /// Shell to use (default: sh on Unix, cmd on Windows).
    pub shell: Option<String>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: Some(Duration::from_secs(300)), // 5 minutes default
            env: Vec::new(),
            capture_output: true,
            shell: None,
        }
    }
}

impl ExecuteOptions {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets whether to capture output.
    #[must_use]
    pub const fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Overrides the shell.
    #[must_use]
    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }
}

/// Executor for running shell commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes a shell command.
    pub async fn execute(&self, command: &str, options: ExecuteOptions) -> Result<CommandOutput> {
        let start = Instant::now();

        let (default_shell, shell_arg) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let shell = options.shell.as_deref().unwrap_or(default_shell);

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command).kill_on_drop(true);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());

        if options.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        tracing::debug!(command, shell, "spawning command");

        let mut child = cmd.spawn().map_err(|e| Error::io("spawn command", e))?;

        let waited = match options.timeout {
            Some(limit) => timeout(limit, wait_for_output(&mut child, options.capture_output)).await,
            None => Ok(wait_for_output(&mut child, options.capture_output).await),
        };

        let Ok(result) = waited else {
            // Kill on timeout; the result is irrelevant since we're reporting the timeout.
            drop(child.kill().await);
            return Ok(CommandOutput {
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: "Command timed out".to_string(),
                timed_out: true,
                duration: start.elapsed(),
            });
        };

        let (exit_code, stdout, stderr) = result?;

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
            timed_out: false,
            duration: start.elapsed(),
        })
    }

    /// Checks if a command exists in PATH.
    #[must_use]
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// Waits for the command to complete and captures output.
async fn wait_for_output(
    child: &mut tokio::process::Child,
    capture: bool,
) -> Result<(i32, String, String)> {
    if !capture {
        let status = child.wait().await.map_err(|e| Error::io("wait for command", e))?;
        return Ok((status.code().unwrap_or(1), String::new(), String::new()));
    }

    let stdout_handle = tokio::spawn(read_lines(child.stdout.take()));
    let stderr_handle = tokio::spawn(read_lines(child.stderr.take()));

    let status = child.wait().await.map_err(|e| Error::io("wait for command", e))?;

    let stdout = stdout_handle.await.map_err(|e| Error::Internal {
        message: format!("stdout task failed: {e}"),
    })?;
    let stderr = stderr_handle.await.map_err(|e| Error::Internal {
        message: format!("stderr task failed: {e}"),
    })?;

    Ok((status.code().unwrap_or(1), stdout, stderr))
}

async fn read_lines<R>(stream: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut output = String::new();
    if let Some(stream) = stream {
        let mut reader = BufReader::new(stream).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            output.push_str(&line);
            output.push('\n');
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_simple_command() {
        let output = Executor::new()
            .execute("echo hello", ExecuteOptions::default())
            .await
            .expect("should succeed");

        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let output = Executor::new()
            .execute("exit 3", ExecuteOptions::default())
            .await
            .expect("should complete");

        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let output = Executor::new()
            .execute(
                "sleep 10",
                ExecuteOptions::default().timeout(Duration::from_millis(100)),
            )
            .await
            .expect("should complete");

        assert!(output.timed_out);
        assert_eq!(output.exit_code, TIMEOUT_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_execute_env_and_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), "x").expect("write marker");

        let output = Executor::new()
            .execute(
                "test -f marker.txt && echo \"$CHECKRUN_TEST_VAR\"",
                ExecuteOptions::default()
                    .cwd(dir.path())
                    .env("CHECKRUN_TEST_VAR", "from-env"),
            )
            .await
            .expect("should complete");

        assert!(output.success(), "output: {}", output.combined_output());
        assert!(output.stdout.contains("from-env"));
    }

    #[test]
    fn test_combined_output_and_tail() {
        let output = CommandOutput {
            exit_code: 1,
            stdout: "a\nb\n".to_string(),
            stderr: "c\n".to_string(),
            timed_out: false,
            duration: Duration::ZERO,
        };

        assert_eq!(output.combined_output(), "a\nb\nc");
        assert_eq!(output.tail(2), "b\nc");
        assert_eq!(output.tail(10), "a\nb\nc");
    }

    #[test]
    fn test_command_exists() {
        if cfg!(unix) {
            assert!(Executor::command_exists("sh"));
        } else {
            assert!(Executor::command_exists("cmd"));
        }

        assert!(!Executor::command_exists("definitely_not_a_real_command_12345"));
    }
}
