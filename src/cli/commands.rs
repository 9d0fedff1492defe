//! CLI command implementation

use super::args::Cli;
use super::output::{OutputEvent, OutputHandler};
use crate::config::{ExitCodePolicy, StagerunConfig, load_workflow_file};
use crate::process::ShellRunner;
use crate::workflow::{
    ConcurrencyLimit, DEFAULT_CONCURRENCY, ExecutionContext, Stage, StageDecl, Workflow,
    WorkflowRunner, build_workflow,
};
use anyhow::{Context, Result, bail};
use std::sync::Arc;

/// Pick the concurrency limit: --jobs, then the workflow file, then config, then the default
fn resolve_concurrency(
    jobs: Option<usize>,
    file: Option<usize>,
    config: Option<usize>,
) -> Result<ConcurrencyLimit> {
    let n = jobs.or(file).or(config).unwrap_or(DEFAULT_CONCURRENCY);
    ConcurrencyLimit::new(n).context("invalid concurrency limit")
}

fn resolve_policy(cli: &Cli, config: &StagerunConfig) -> ExitCodePolicy {
    if cli.ignore_exit_codes {
        ExitCodePolicy::Ignore
    } else {
        config.exit_code_policy()
    }
}

/// Describe the stages that would run, led by the workflow file's description
pub fn format_plan(
    workflow: &Workflow,
    limit: ConcurrencyLimit,
    description: Option<&str>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        lines.push(description.to_string());
    }
    lines.push(format!(
        "{} stage(s), concurrency {}",
        workflow.len(),
        limit
    ));
    for (index, stage) in workflow.stages().iter().enumerate() {
        match stage {
            Stage::Sequential(cmd) => lines.push(format!("[{}] sequential: {}", index + 1, cmd)),
            Stage::Concurrent(cmds) => {
                lines.push(format!("[{}] concurrent ({}):", index + 1, cmds.len()));
                for cmd in cmds {
                    lines.push(format!("      {}", cmd));
                }
            }
        }
    }
    lines
}

/// Assemble the workflow from the command line and run it.
///
/// Returns the process exit code. Construction errors are returned before
/// any command starts.
pub async fn run_workflow(
    cli: Cli,
    decls: Vec<StageDecl>,
    handler: Arc<dyn OutputHandler>,
) -> Result<i32> {
    let config = StagerunConfig::load(cli.dir.as_deref())?;

    let (workflow, file_concurrency, description) = match cli.file {
        Some(ref path) => {
            let file = load_workflow_file(path)
                .with_context(|| format!("failed to load workflow '{}'", path))?;
            (file.to_workflow()?, file.concurrency, Some(file.description))
        }
        None => {
            if decls.is_empty() {
                bail!("no stages given (use --seq, --con, --stdin or --file)");
            }
            let stdin = std::io::stdin();
            (build_workflow(&decls, stdin.lock())?, None, None)
        }
    };

    let limit = resolve_concurrency(cli.jobs, file_concurrency, config.defaults.concurrency)?;
    let policy = resolve_policy(&cli, &config);

    tracing::debug!(
        stages = workflow.len(),
        commands = workflow.command_count(),
        concurrency = limit.get(),
        ?policy,
        "workflow assembled"
    );

    if cli.dry_run {
        for message in format_plan(&workflow, limit, description.as_deref()) {
            handler.emit(OutputEvent::Info { message });
        }
        return Ok(0);
    }

    let mut shell = ShellRunner::new(config.shell());
    if let Some(ref dir) = cli.dir {
        shell = shell.with_working_dir(dir);
    }

    let ctx = ExecutionContext::new(Arc::new(shell), handler, policy);
    let result = WorkflowRunner::new(ctx).run(workflow, limit).await;

    Ok(result.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::testing::MockHandler;
    use clap::Parser;

    #[test]
    fn test_resolve_concurrency_precedence() {
        assert_eq!(resolve_concurrency(Some(2), Some(3), Some(5)).unwrap().get(), 2);
        assert_eq!(resolve_concurrency(None, Some(3), Some(5)).unwrap().get(), 3);
        assert_eq!(resolve_concurrency(None, None, Some(5)).unwrap().get(), 5);
        assert_eq!(
            resolve_concurrency(None, None, None).unwrap().get(),
            DEFAULT_CONCURRENCY
        );
        assert!(resolve_concurrency(Some(0), None, None).is_err());
    }

    #[test]
    fn test_resolve_policy() {
        let mut config = StagerunConfig::default();
        let cli = Cli::parse_from(["stagerun", "-s", "x"]);
        assert_eq!(resolve_policy(&cli, &config), ExitCodePolicy::Fail);

        config.defaults.exit_codes = Some(ExitCodePolicy::Ignore);
        assert_eq!(resolve_policy(&cli, &config), ExitCodePolicy::Ignore);

        let cli = Cli::parse_from(["stagerun", "--ignore-exit-codes", "-s", "x"]);
        assert_eq!(
            resolve_policy(&cli, &StagerunConfig::default()),
            ExitCodePolicy::Ignore
        );
    }

    #[test]
    fn test_format_plan() {
        let wf = Workflow::new(vec![
            Stage::Sequential("a".into()),
            Stage::Concurrent(vec!["b".into(), "c".into()]),
        ])
        .unwrap();

        let lines = format_plan(&wf, ConcurrencyLimit::new(2).unwrap(), None);
        assert_eq!(lines[0], "2 stage(s), concurrency 2");
        assert_eq!(lines[1], "[1] sequential: a");
        assert_eq!(lines[2], "[2] concurrent (2):");
        assert_eq!(lines.len(), 5);

        let lines = format_plan(&wf, ConcurrencyLimit::new(2).unwrap(), Some("  "));
        assert_eq!(lines.len(), 5);
    }

    #[tokio::test]
    async fn test_dry_run_shows_file_description() {
        let dir = tempfile::TempDir::new().unwrap();
        let wf_path = dir.path().join("wf.toml");
        std::fs::write(
            &wf_path,
            "description = \"nightly build\"\n\n[[stage]]\nrun = \"touch marker\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "stagerun",
            "--dry-run",
            "--dir",
            dir.path().to_str().unwrap(),
            "--file",
            wf_path.to_str().unwrap(),
        ]);
        let handler = MockHandler::new();

        let code = run_workflow(cli, Vec::new(), Arc::new(handler.clone()))
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(!dir.path().join("marker").exists());
        assert_eq!(
            handler.events()[0],
            OutputEvent::Info {
                message: "nightly build".into()
            }
        );
    }

    #[tokio::test]
    async fn test_no_stages_is_error_before_running() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::parse_from(["stagerun", "--dir", dir.path().to_str().unwrap()]);
        let handler = MockHandler::new();

        let err = run_workflow(cli, Vec::new(), Arc::new(handler.clone()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no stages"));
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let dir = tempfile::TempDir::new().unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let cli = Cli::parse_from(["stagerun", "--dry-run", "--dir", dir_arg, "-s", "touch marker"]);
        let decls = vec![StageDecl::Sequential("touch marker".into())];
        let handler = MockHandler::new();

        let code = run_workflow(cli, decls, Arc::new(handler.clone()))
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(!dir.path().join("marker").exists());
        assert!(!handler.events().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_workflow_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let wf_path = dir.path().join("wf.toml");
        std::fs::write(
            &wf_path,
            "concurrency = 2\n\n[[stage]]\nrun = \"touch a\"\n\n[[stage]]\nparallel = [\"touch b\", \"false\"]\n\n[[stage]]\nrun = \"touch c\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "stagerun",
            "--dir",
            dir.path().to_str().unwrap(),
            "--file",
            wf_path.to_str().unwrap(),
        ]);
        let handler = MockHandler::new();

        let code = run_workflow(cli, Vec::new(), Arc::new(handler.clone()))
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(dir.path().join("c").exists());
        assert_eq!(handler.failures(), vec![("false".to_string(), false)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_sequential_failure_exit_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::parse_from(["stagerun", "--dir", dir.path().to_str().unwrap()]);
        let decls = vec![
            StageDecl::Sequential("exit 1".into()),
            StageDecl::Sequential("touch after".into()),
        ];
        let handler = MockHandler::new();

        let code = run_workflow(cli, decls, Arc::new(handler.clone()))
            .await
            .unwrap();

        assert_eq!(code, 1);
        assert!(!dir.path().join("after").exists());
        assert_eq!(handler.failures(), vec![("exit 1".to_string(), true)]);
    }
}
