//! External process execution.
//!
//! The orchestrator talks to a [`ProcessRunner`] so tests can substitute a
//! recording runner for real child processes. [`SystemRunner`] spawns the
//! command with `tokio::process`, inherits stdio, and waits for it to exit.

use crate::models::{ExitOutcome, Invocation, EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND};
use std::io;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure to run an external process at all.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RunnerError {
    /// Shell-style exit code for a process that never completed.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                EXIT_NOT_FOUND
            }
            _ => EXIT_CANNOT_EXECUTE,
        }
    }

    /// Convert into a failed outcome so the run can carry on.
    pub fn into_outcome(self) -> ExitOutcome {
        ExitOutcome::not_started(self.exit_code(), self.to_string())
    }
}

/// Runs one invocation to completion.
pub trait ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, RunnerError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, RunnerError> {
        debug!("Spawning: {}", invocation.command_line());

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let status = child.wait().await.map_err(|source| RunnerError::Wait {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(outcome_from_status(status))
    }
}

/// Map an exit status onto shell exit-code conventions.
pub fn outcome_from_status(status: ExitStatus) -> ExitOutcome {
    if status.success() {
        return ExitOutcome::success();
    }

    if let Some(code) = status.code() {
        return ExitOutcome::failed(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitOutcome::failed(128 + signal);
        }
    }

    ExitOutcome::failed(1)
}
