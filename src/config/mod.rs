//! Configuration types and loading for stagerun

mod loader;
mod policy;
mod workflow;

pub use loader::{StagerunConfig, load_workflow_file};
pub use policy::ExitCodePolicy;
pub use workflow::WorkflowConfig;
