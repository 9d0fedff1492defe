//! Configuration loading with multi-layer merge

use super::{ExitCodePolicy, WorkflowConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level stagerun configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StagerunConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,
}

/// Global default settings
///
/// Unset fields stay `None` so a later layer only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Max commands running at once in a concurrent stage
    pub concurrency: Option<usize>,

    /// Shell used to run commands (`<shell> -c <command>`)
    pub shell: Option<String>,

    /// How non-zero exit codes are treated
    pub exit_codes: Option<ExitCodePolicy>,
}

impl StagerunConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/stagerun/config.toml
    /// 3. .stagerun/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = Self::project_config_path(project_dir);
        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/stagerun/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stagerun/config.toml"))
    }

    fn project_config_path(project_dir: Option<&Path>) -> PathBuf {
        project_dir
            .map(|p| p.join(".stagerun/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".stagerun/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.concurrency.is_some() {
            self.defaults.concurrency = other.defaults.concurrency;
        }
        if other.defaults.shell.is_some() {
            self.defaults.shell = other.defaults.shell;
        }
        if other.defaults.exit_codes.is_some() {
            self.defaults.exit_codes = other.defaults.exit_codes;
        }
    }

    pub fn shell(&self) -> &str {
        self.defaults.shell.as_deref().unwrap_or("sh")
    }

    pub fn exit_code_policy(&self) -> ExitCodePolicy {
        self.defaults.exit_codes.unwrap_or_default()
    }
}

/// Load and validate a workflow file. `~` in the path is expanded.
pub fn load_workflow_file(path: &str) -> Result<WorkflowConfig> {
    let expanded = shellexpand::tilde(path);
    let path = Path::new(&*expanded);

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let workflow: WorkflowConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;

    workflow.validate().map_err(|errors| {
        anyhow::anyhow!("workflow validation failed:\n  {}", errors.join("\n  "))
    })?;

    Ok(workflow)
}
