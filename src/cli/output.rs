//! Output handlers for workflow runs
//!
//! Supports console (pretty), JSON and quiet output modes. Everything goes to
//! stderr: stdout belongs to the commands being run.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

/// Events emitted during workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    WorkflowStart {
        stages: usize,
        concurrency: usize,
    },
    StageStart {
        index: usize,
        total: usize,
        kind: String,
        commands: usize,
    },
    CommandFailed {
        command: String,
        outcome: String,
        fatal: bool,
    },
    StageComplete {
        index: usize,
        duration_ms: u64,
        failures: usize,
    },
    WorkflowComplete {
        success: bool,
        duration_ms: u64,
        stages_completed: usize,
    },
    WorkflowError {
        error: String,
    },
    Info {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);
}

/// Human-readable output on stderr
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    /// Create a new console handler
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }

    fn format_failure(command: &str, outcome: &str, fatal: bool) -> String {
        if fatal {
            format!(
                "error: command '{}' {} (aborting workflow)",
                command, outcome
            )
        } else {
            format!("error: command '{}' {}", command, outcome)
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        let mut err = io::stderr().lock();
        let _ = match event {
            OutputEvent::CommandFailed {
                command,
                outcome,
                fatal,
            } => writeln!(err, "{}", Self::format_failure(&command, &outcome, fatal)),
            OutputEvent::WorkflowError { error } => writeln!(err, "error: {}", error),
            OutputEvent::Info { message } => writeln!(err, "{}", message),
            _ if !self.debug => Ok(()),
            OutputEvent::WorkflowStart {
                stages,
                concurrency,
            } => writeln!(
                err,
                "Running {} stage(s), concurrency {}",
                stages, concurrency
            ),
            OutputEvent::StageStart {
                index,
                total,
                kind,
                commands,
            } => writeln!(
                err,
                "[{}/{}] {} stage ({} command(s))",
                index, total, kind, commands
            ),
            OutputEvent::StageComplete {
                index,
                duration_ms,
                failures,
            } => writeln!(
                err,
                "[{}] done in {} ({} failure(s))",
                index,
                Self::format_duration(duration_ms),
                failures
            ),
            OutputEvent::WorkflowComplete {
                success,
                duration_ms,
                stages_completed,
            } => {
                if success {
                    writeln!(
                        err,
                        "✓ Workflow completed ({} stages in {})",
                        stages_completed,
                        Self::format_duration(duration_ms)
                    )
                } else {
                    writeln!(
                        err,
                        "✗ Workflow failed after {} stages ({})",
                        stages_completed,
                        Self::format_duration(duration_ms)
                    )
                }
            }
        };
    }
}

/// One JSON object per line on stderr
pub struct JsonHandler;

impl JsonHandler {
    fn to_json(event: &OutputEvent) -> serde_json::Result<String> {
        serde_json::to_string(event)
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        if let Ok(s) = Self::to_json(&event) {
            let _ = writeln!(io::stderr().lock(), "{}", s);
        }
    }
}

/// Events quiet mode still prints
fn is_error_event(event: &OutputEvent) -> bool {
    matches!(
        event,
        OutputEvent::CommandFailed { .. } | OutputEvent::WorkflowError { .. }
    )
}

/// Only errors, nothing else
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if is_error_event(&event) {
            ConsoleHandler::new(false).emit(event)
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Arc<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Arc::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Arc::new(JsonHandler),
        OutputMode::Quiet => Arc::new(QuietHandler),
    }
}
