//! Workflow data model: commands, stages and the concurrency limit

use std::fmt;
use thiserror::Error;

/// Default number of commands a concurrent stage may run at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Errors raised while assembling a workflow
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("workflow has no stages")]
    Empty,

    #[error("concurrent stage {index} has no commands")]
    EmptyStage { index: usize },

    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
}

/// A shell command line, passed verbatim to the shell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One unit of a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// A single command that must finish before anything else starts
    Sequential(Command),
    /// Independent commands run under the concurrency limit
    Concurrent(Vec<Command>),
}

impl Stage {
    pub fn kind(&self) -> &'static str {
        match self {
            Stage::Sequential(_) => "sequential",
            Stage::Concurrent(_) => "concurrent",
        }
    }

    pub fn commands(&self) -> &[Command] {
        match self {
            Stage::Sequential(cmd) => std::slice::from_ref(cmd),
            Stage::Concurrent(cmds) => cmds,
        }
    }
}

/// An ordered, non-empty list of stages
///
/// Fields are private so a workflow cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    stages: Vec<Stage>,
}

impl Workflow {
    /// Build a workflow, rejecting empty workflows and empty concurrent stages
    pub fn new(stages: Vec<Stage>) -> Result<Self, WorkflowError> {
        if stages.is_empty() {
            return Err(WorkflowError::Empty);
        }
        for (index, stage) in stages.iter().enumerate() {
            if let Stage::Concurrent(cmds) = stage {
                if cmds.is_empty() {
                    return Err(WorkflowError::EmptyStage { index });
                }
            }
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Total number of commands across all stages
    pub fn command_count(&self) -> usize {
        self.stages.iter().map(|s| s.commands().len()).sum()
    }
}

impl IntoIterator for Workflow {
    type Item = Stage;
    type IntoIter = std::vec::IntoIter<Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.into_iter()
    }
}

/// Maximum number of commands of one concurrent stage running at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimit(usize);

impl ConcurrencyLimit {
    pub fn new(limit: usize) -> Result<Self, WorkflowError> {
        if limit == 0 {
            return Err(WorkflowError::ZeroConcurrency);
        }
        Ok(Self(limit))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self(DEFAULT_CONCURRENCY)
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
