//! Workflow runner - drives stages strictly in order

use super::executor::{ExecutionContext, StageExecutor};
use super::model::{ConcurrencyLimit, Workflow};
use super::state::WorkflowResult;
use crate::cli::{OutputEvent, OutputHandler};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Workflow runner
pub struct WorkflowRunner {
    executor: StageExecutor,
    handler: Arc<dyn OutputHandler>,
}

impl WorkflowRunner {
    /// Create a new workflow runner
    pub fn new(ctx: ExecutionContext) -> Self {
        Self {
            handler: ctx.handler.clone(),
            executor: StageExecutor::new(ctx),
        }
    }

    /// Run a workflow.
    ///
    /// Each stage is fully drained before the next one starts. The first
    /// aborting stage ends the run; later stages never start.
    pub async fn run(&self, workflow: Workflow, limit: ConcurrencyLimit) -> WorkflowResult {
        let start = Instant::now();
        let total = workflow.len();
        let mut result = WorkflowResult::new(total);

        tracing::info!(stages = total, concurrency = limit.get(), "starting workflow");
        self.handler.emit(OutputEvent::WorkflowStart {
            stages: total,
            concurrency: limit.get(),
        });

        for (index, stage) in workflow.into_iter().enumerate() {
            self.handler.emit(OutputEvent::StageStart {
                index: index + 1,
                total,
                kind: stage.kind().to_string(),
                commands: stage.commands().len(),
            });

            let span = tracing::info_span!("stage", index = index + 1, kind = stage.kind());
            let report = self.executor.execute(&stage, limit).instrument(span).await;

            tracing::debug!(
                stage = index + 1,
                duration_ms = report.duration.as_millis() as u64,
                commands = report.outcomes.len(),
                failures = report.failures,
                "stage finished"
            );
            self.handler.emit(OutputEvent::StageComplete {
                index: index + 1,
                duration_ms: report.duration.as_millis() as u64,
                failures: report.failures,
            });

            if !result.record(report) {
                if let Some(ref reason) = result.aborted {
                    tracing::info!(reason = %reason, "aborting workflow");
                }
                break;
            }
        }

        result.duration = start.elapsed();

        tracing::info!(
            success = result.success,
            stages_completed = result.stages_completed(),
            total_stages = result.total_stages,
            non_fatal_failures = result.non_fatal_failures(),
            "workflow finished"
        );

        self.handler.emit(OutputEvent::WorkflowComplete {
            success: result.success,
            duration_ms: result.duration.as_millis() as u64,
            stages_completed: result.stages_completed(),
        });

        result
    }
}
