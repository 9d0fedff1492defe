//! Process execution: spawn one shell command and classify how it ended.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

use crate::config::ExitCodePolicy;
use crate::workflow::Command;

/// How a single command terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Exited normally with status 0.
    Succeeded,
    /// Exited normally with a non-zero status.
    ExitedNonZero(i32),
    /// Terminated by an uncaught signal.
    KilledBySignal { signal: i32, core_dumped: bool },
    /// The process could not be started (or could not be waited on).
    SpawnFailed(String),
}

impl ExecutionOutcome {
    /// Whether this outcome counts as a failure under the given policy.
    ///
    /// Signal deaths and spawn failures are failures regardless of policy.
    pub fn is_failure(&self, policy: ExitCodePolicy) -> bool {
        match self {
            ExecutionOutcome::Succeeded => false,
            ExecutionOutcome::ExitedNonZero(_) => policy == ExitCodePolicy::Fail,
            ExecutionOutcome::KilledBySignal { .. } | ExecutionOutcome::SpawnFailed(_) => true,
        }
    }

    /// Spawn failures abort the workflow whatever kind of stage they occur in.
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, ExecutionOutcome::SpawnFailed(_))
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Succeeded => write!(f, "succeeded"),
            ExecutionOutcome::ExitedNonZero(code) => write!(f, "exited with code {}", code),
            ExecutionOutcome::KilledBySignal {
                signal,
                core_dumped,
            } => {
                write!(f, "killed by signal {}", signal)?;
                if *core_dumped {
                    write!(f, " (core dumped)")?;
                }
                Ok(())
            }
            ExecutionOutcome::SpawnFailed(reason) => write!(f, "failed to spawn: {}", reason),
        }
    }
}

fn classify_parts(code: Option<i32>, signal: Option<i32>, core_dumped: bool) -> ExecutionOutcome {
    match (code, signal) {
        (Some(0), _) => ExecutionOutcome::Succeeded,
        (Some(code), _) => ExecutionOutcome::ExitedNonZero(code),
        (None, Some(signal)) => ExecutionOutcome::KilledBySignal {
            signal,
            core_dumped,
        },
        // Neither a code nor a signal: nothing the host tells us apart from "it ended badly".
        (None, None) => ExecutionOutcome::SpawnFailed("process ended without exit status".into()),
    }
}

/// Classify an exit status into an [`ExecutionOutcome`].
pub(crate) fn classify_exit_status(status: &std::process::ExitStatus) -> ExecutionOutcome {
    #[cfg(unix)]
    {
        classify_parts(status.code(), status.signal(), status.core_dumped())
    }
    #[cfg(not(unix))]
    {
        classify_parts(status.code(), None, false)
    }
}

/// Something that can execute one command to completion.
///
/// Implementations keep no per-command state: every call is one attempt.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and report how it terminated.
    async fn execute(&self, command: &Command) -> ExecutionOutcome;
}

/// Runs commands through `<shell> -c <command>` with inherited stdio.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    working_dir: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn execute(&self, command: &Command) -> ExecutionOutcome {
        let spawned = {
            let mut cmd = tokio::process::Command::new(&self.shell);
            cmd.arg("-c").arg(command.as_str());
            if let Some(ref dir) = self.working_dir {
                cmd.current_dir(dir);
            }
            cmd.spawn()
        };

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(command = %command, error = %e, "spawn failed");
                return ExecutionOutcome::SpawnFailed(e.to_string());
            }
        };

        tracing::debug!(command = %command, pid = ?child.id(), "spawned");

        match child.wait().await {
            Ok(status) => classify_exit_status(&status),
            Err(e) => ExecutionOutcome::SpawnFailed(format!("failed to wait: {}", e)),
        }
    }
}
