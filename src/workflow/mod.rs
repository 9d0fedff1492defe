//! Workflow execution engine for stagerun
//!
//! This module handles:
//! - The stage model (sequential commands and concurrent groups)
//! - Assembling a normalized workflow from user declarations
//! - Bounded-concurrency execution of concurrent groups
//! - Fail/continue decisions per stage, in strict stage order
//!
//! # Example
//!
//! ```ignore
//! use stagerun::workflow::{ExecutionContext, Stage, Workflow, WorkflowRunner};
//!
//! let workflow = Workflow::new(vec![
//!     Stage::Sequential("make build".into()),
//!     Stage::Concurrent(vec!["make test".into(), "make lint".into()]),
//! ])?;
//! let runner = WorkflowRunner::new(ctx);
//! let result = runner.run(workflow, ConcurrencyLimit::default()).await;
//! std::process::exit(result.exit_code());
//! ```

mod builder;
mod executor;
mod model;
mod pool;
mod runner;
mod state;

pub use builder::{StageDecl, build_workflow};
pub use executor::ExecutionContext;
pub use model::{Command, ConcurrencyLimit, DEFAULT_CONCURRENCY, Stage, Workflow, WorkflowError};
pub use runner::WorkflowRunner;
