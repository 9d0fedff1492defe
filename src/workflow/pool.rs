//! Bounded-concurrency execution of independent commands

use super::model::{Command, ConcurrencyLimit};
use crate::cli::{OutputEvent, OutputHandler};
use crate::config::ExitCodePolicy;
use crate::process::{CommandRunner, ExecutionOutcome};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Report a failing outcome to the output handler and the log
pub(crate) fn report_failure(
    handler: &dyn OutputHandler,
    command: &Command,
    outcome: &ExecutionOutcome,
    fatal: bool,
) {
    tracing::info!(command = %command, outcome = %outcome, fatal, "command failed");
    handler.emit(OutputEvent::CommandFailed {
        command: command.to_string(),
        outcome: outcome.to_string(),
        fatal,
    });
}

/// Wait for a free slot. A closed semaphore means the command can never start.
async fn acquire_slot(semaphore: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit, ExecutionOutcome> {
    semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ExecutionOutcome::SpawnFailed(format!("no worker slot: {}", e)))
}

/// Runs a batch of independent commands with at most `limit` in flight.
pub struct WorkerPool {
    runner: Arc<dyn CommandRunner>,
    handler: Arc<dyn OutputHandler>,
    policy: ExitCodePolicy,
}

impl WorkerPool {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        handler: Arc<dyn OutputHandler>,
        policy: ExitCodePolicy,
    ) -> Self {
        Self {
            runner,
            handler,
            policy,
        }
    }

    /// Run every command and return one outcome per command, in input order.
    ///
    /// A command is admitted only once a permit is free, and holds it until
    /// its process has terminated. Returns after all commands have finished;
    /// a failing command never cuts its siblings short. Failures are reported
    /// from inside the worker as soon as they are seen.
    pub async fn run_all(
        &self,
        commands: &[Command],
        limit: ConcurrencyLimit,
    ) -> Vec<(Command, ExecutionOutcome)> {
        let semaphore = Arc::new(Semaphore::new(limit.get().min(Semaphore::MAX_PERMITS)));
        let mut handles = Vec::with_capacity(commands.len());

        for command in commands.iter().cloned() {
            let permit = match acquire_slot(&semaphore).await {
                Ok(permit) => permit,
                Err(outcome) => {
                    report_failure(self.handler.as_ref(), &command, &outcome, true);
                    handles.push((command, Err(outcome)));
                    continue;
                }
            };
            let runner = self.runner.clone();
            let handler = self.handler.clone();
            let policy = self.policy;
            let task_command = command.clone();

            tracing::debug!(command = %command, "admitting command");

            let handle = tokio::spawn(async move {
                let _permit = permit; // Hold permit until the process exits

                let outcome = runner.execute(&task_command).await;
                if outcome.is_failure(policy) {
                    report_failure(
                        handler.as_ref(),
                        &task_command,
                        &outcome,
                        outcome.is_always_fatal(),
                    );
                }
                outcome
            });

            handles.push((command, Ok(handle)));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (command, handle) in handles {
            let outcome = match handle {
                Err(outcome) => outcome,
                Ok(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let outcome =
                            ExecutionOutcome::SpawnFailed(format!("worker task failed: {}", e));
                        report_failure(self.handler.as_ref(), &command, &outcome, true);
                        outcome
                    }
                },
            };
            results.push((command, outcome));
        }

        results
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fake runner: sleeps, then returns a scripted outcome (default success).
    /// Tracks how many commands are in flight and the peak seen.
    #[derive(Default)]
    pub struct FakeRunner {
        pub delay: Duration,
        outcomes: HashMap<String, ExecutionOutcome>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        started: Mutex<Vec<String>>,
        finished: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        pub fn new(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        pub fn with_outcome(mut self, command: &str, outcome: ExecutionOutcome) -> Self {
            self.outcomes.insert(command.to_string(), outcome);
            self
        }

        pub fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        pub fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }

        pub fn finished(&self) -> Vec<String> {
            self.finished.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn execute(&self, command: &Command) -> ExecutionOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.started.lock().unwrap().push(command.to_string());

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().unwrap().push(command.to_string());
            self.outcomes
                .get(command.as_str())
                .cloned()
                .unwrap_or(ExecutionOutcome::Succeeded)
        }
    }
}
