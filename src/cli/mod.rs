//! CLI module for stagerun
//!
//! This module provides:
//! - Argument parsing that keeps stage declarations in order
//! - The run command (assemble, plan or execute a workflow)
//! - Output handlers (console, JSON, quiet)

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, stage_decls};
pub use commands::run_workflow;
pub use output::{OutputEvent, OutputHandler, create_handler};

#[cfg(test)]
pub(crate) use output::testing;
