//! Workflow file format

use crate::workflow::{Command, Stage, Workflow, WorkflowError};
use serde::{Deserialize, Serialize};

/// One stage entry in a workflow file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Optional label, only used in messages
    pub name: Option<String>,

    /// Command for a sequential stage
    pub run: Option<String>,

    /// Commands for a concurrent stage
    pub parallel: Option<Vec<String>>,
}

impl StageConfig {
    fn label(&self, index: usize) -> String {
        match self.name {
            Some(ref name) => format!("stage '{}'", name),
            None => format!("stage {}", index + 1),
        }
    }
}

/// Full workflow file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Concurrency limit for this workflow
    pub concurrency: Option<usize>,

    /// Stages in order
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,
}

impl WorkflowConfig {
    /// Validate the workflow file, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.stages.is_empty() {
            errors.push("workflow has no stages".to_string());
        }

        if self.concurrency == Some(0) {
            errors.push("concurrency must be at least 1".to_string());
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let label = stage.label(index);
            match (&stage.run, &stage.parallel) {
                (Some(_), Some(_)) => {
                    errors.push(format!("{} has both 'run' and 'parallel'", label))
                }
                (None, None) => errors.push(format!("{} needs 'run' or 'parallel'", label)),
                (Some(run), None) if run.trim().is_empty() => {
                    errors.push(format!("{} has an empty 'run' command", label))
                }
                (None, Some(cmds)) if cmds.is_empty() => {
                    errors.push(format!("{} has an empty 'parallel' list", label))
                }
                (None, Some(cmds)) if cmds.iter().any(|c| c.trim().is_empty()) => {
                    errors.push(format!("{} has an empty command in 'parallel'", label))
                }
                _ => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Convert into a workflow. Stages are taken as written; adjacent
    /// `parallel` entries stay separate stages.
    pub fn to_workflow(&self) -> Result<Workflow, WorkflowError> {
        let stages = self
            .stages
            .iter()
            .filter_map(|stage| match (&stage.run, &stage.parallel) {
                (Some(run), _) => Some(Stage::Sequential(Command::new(run.clone()))),
                (None, Some(cmds)) => Some(Stage::Concurrent(
                    cmds.iter().cloned().map(Command::from).collect(),
                )),
                (None, None) => None,
            })
            .collect();
        Workflow::new(stages)
    }
}
