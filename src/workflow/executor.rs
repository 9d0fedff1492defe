//! Stage execution logic

use super::model::{Command, ConcurrencyLimit, Stage};
use super::pool::{WorkerPool, report_failure};
use crate::cli::OutputHandler;
use crate::config::ExitCodePolicy;
use crate::process::{CommandRunner, ExecutionOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a stage stopped the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortReason {
    pub command: Command,
    pub outcome: ExecutionOutcome,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command '{}' {}", self.command, self.outcome)
    }
}

/// Whether the workflow may go on after a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Continue,
    Abort(AbortReason),
}

/// What happened while running one stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub result: StageResult,
    pub outcomes: Vec<(Command, ExecutionOutcome)>,
    pub duration: Duration,
    /// Commands whose outcome counted as a failure under the policy
    pub failures: usize,
    /// Failures that were reported as aborting the workflow
    pub fatal_failures: usize,
}

/// Shared dependencies for running stages
#[derive(Clone)]
pub struct ExecutionContext {
    pub runner: Arc<dyn CommandRunner>,
    pub handler: Arc<dyn OutputHandler>,
    pub policy: ExitCodePolicy,
}

impl ExecutionContext {
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
}

/// Runs one stage and decides whether the workflow continues
pub struct StageExecutor {
    ctx: ExecutionContext,
    pool: WorkerPool,
}

impl StageExecutor {
    pub fn new(ctx: ExecutionContext) -> Self {
        let pool = WorkerPool::new(ctx.runner.clone(), ctx.handler.clone(), ctx.policy);
        Self { ctx, pool }
    }

    /// Execute a stage.
    ///
    /// A failing sequential command aborts the workflow. Failures inside a
    /// concurrent stage are reported and the stage continues, except for
    /// spawn failures, which abort once every sibling has finished.
    pub async fn execute(&self, stage: &Stage, limit: ConcurrencyLimit) -> StageReport {
        let start = Instant::now();
        match stage {
            Stage::Sequential(command) => self.execute_sequential(command, start).await,
            Stage::Concurrent(commands) => self.execute_concurrent(commands, limit, start).await,
        }
    }

    async fn execute_sequential(&self, command: &Command, start: Instant) -> StageReport {
        let outcome = self.ctx.runner.execute(command).await;
        let failed = outcome.is_failure(self.ctx.policy);

        let result = if failed {
            report_failure(self.ctx.handler.as_ref(), command, &outcome, true);
            StageResult::Abort(AbortReason {
                command: command.clone(),
                outcome: outcome.clone(),
            })
        } else {
            StageResult::Continue
        };

        StageReport {
            result,
            outcomes: vec![(command.clone(), outcome)],
            duration: start.elapsed(),
            failures: usize::from(failed),
            fatal_failures: usize::from(failed),
        }
    }

    async fn execute_concurrent(
        &self,
        commands: &[Command],
        limit: ConcurrencyLimit,
        start: Instant,
    ) -> StageReport {
        let outcomes = self.pool.run_all(commands, limit).await;

        let failures = outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failure(self.ctx.policy))
            .count();
        let fatal_failures = outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_always_fatal())
            .count();

        let result = outcomes
            .iter()
            .find(|(_, outcome)| outcome.is_always_fatal())
            .map(|(command, outcome)| {
                StageResult::Abort(AbortReason {
                    command: command.clone(),
                    outcome: outcome.clone(),
                })
            })
            .unwrap_or(StageResult::Continue);

        StageReport {
            result,
            outcomes,
            duration: start.elapsed(),
            failures,
            fatal_failures,
        }
    }
}
