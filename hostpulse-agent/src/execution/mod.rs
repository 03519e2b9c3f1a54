//! External utility execution for HostPulse
//!
//! Samplers and transports shell out to OS utilities (pmset, osx-cpu-temp,
//! powermetrics, osascript). Every call here is:
//! - bounded by a timeout, the child being killed when it elapses
//! - captured (stdout/stderr) rather than inherited
//! - reported as a typed error so callers can degrade a single dimension

use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Failure to obtain usable output from an external utility
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} exited with code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external utilities with a hard timeout
pub struct CommandExecutor;

impl CommandExecutor {
    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; use [`CommandExecutor::run_checked`]
    /// when only successful output is meaningful.
    pub async fn run(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let start_time = Instant::now();
        debug!("Executing {} {:?} (timeout: {:?})", program, args, timeout);

        let child = AsyncCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| CommandError::TimedOut {
                program: program.to_string(),
                timeout,
            })?
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        debug!(
            "{} finished in {}ms with {:?}",
            program,
            start_time.elapsed().as_millis(),
            output.status.code()
        );

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        })
    }

    /// Run a command and treat a non-zero exit as [`CommandError::Failed`]
    pub async fn run_checked(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let output = Self::run(program, args, timeout).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(CommandError::Failed {
                program: program.to_string(),
                code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}
