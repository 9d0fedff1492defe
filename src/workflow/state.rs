//! Workflow run results

use super::executor::{AbortReason, StageReport, StageResult};
use std::time::Duration;

/// Final result of a workflow run
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    /// Whether every stage continued
    pub success: bool,

    /// Number of stages in the workflow
    pub total_stages: usize,

    /// Per-stage reports, in execution order
    pub stages: Vec<StageReport>,

    /// The failure that stopped the run, if any
    pub aborted: Option<AbortReason>,

    /// Total elapsed time
    pub duration: Duration,
}

impl WorkflowResult {
    pub(crate) fn new(total_stages: usize) -> Self {
        Self {
            success: true,
            total_stages,
            stages: Vec::with_capacity(total_stages),
            aborted: None,
            duration: Duration::ZERO,
        }
    }

    /// Record a finished stage. Returns false when the run must stop.
    pub(crate) fn record(&mut self, report: StageReport) -> bool {
        let keep_going = match report.result {
            StageResult::Continue => true,
            StageResult::Abort(ref reason) => {
                self.success = false;
                self.aborted = Some(reason.clone());
                false
            }
        };
        self.stages.push(report);
        keep_going
    }

    /// Stages that ran to completion
    pub fn stages_completed(&self) -> usize {
        self.stages.len()
    }

    /// Failures that were reported without stopping the run, including
    /// siblings that finished inside an aborting concurrent stage
    pub fn non_fatal_failures(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.failures - s.fatal_failures)
            .sum()
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExecutionOutcome;
    use crate::workflow::Command;

    fn report(result: StageResult, failures: usize) -> StageReport {
        let fatal_failures = match result {
            StageResult::Abort(_) => 1,
            StageResult::Continue => 0,
        };
        StageReport {
            result,
            outcomes: Vec::new(),
            duration: Duration::from_millis(1),
            failures,
            fatal_failures,
        }
    }

    #[test]
    fn test_all_continue_is_success() {
        let mut result = WorkflowResult::new(2);
        assert!(result.record(report(StageResult::Continue, 0)));
        assert!(result.record(report(StageResult::Continue, 2)));

        assert!(result.success);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.stages_completed(), 2);
        assert_eq!(result.non_fatal_failures(), 2);
    }

    #[test]
    fn test_abort_recorded() {
        let reason = AbortReason {
            command: Command::new("exit 1"),
            outcome: ExecutionOutcome::ExitedNonZero(1),
        };
        let mut result = WorkflowResult::new(3);
        assert!(result.record(report(StageResult::Continue, 0)));
        assert!(!result.record(report(StageResult::Abort(reason.clone()), 1)));

        assert!(!result.success);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.aborted, Some(reason));
        assert_eq!(result.non_fatal_failures(), 0);
    }

    #[test]
    fn test_sibling_failure_counted_when_stage_aborts() {
        let reason = AbortReason {
            command: Command::new("missing"),
            outcome: ExecutionOutcome::SpawnFailed("not found".into()),
        };
        let stage = StageReport {
            result: StageResult::Abort(reason),
            outcomes: vec![
                (
                    Command::new("missing"),
                    ExecutionOutcome::SpawnFailed("not found".into()),
                ),
                (Command::new("false"), ExecutionOutcome::ExitedNonZero(1)),
            ],
            duration: Duration::from_millis(1),
            failures: 2,
            fatal_failures: 1,
        };

        let mut result = WorkflowResult::new(2);
        assert!(!result.record(stage));
        assert_eq!(result.non_fatal_failures(), 1);
    }
}
