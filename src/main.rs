mod cli;
mod config;
mod logging;
mod process;
mod workflow;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};
use cli::{Cli, OutputEvent};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let args = Cli::from_arg_matches(&matches)?;
    let decls = cli::stage_decls(&matches);

    let log_file = match args.log_file {
        Some(Some(ref path)) => Some(path.clone()),
        Some(None) => Some(logging::default_log_path()?),
        None => None,
    };
    logging::init_logging(args.debug, args.quiet, log_file)?;

    let handler = cli::create_handler(args.output_mode(), args.debug);

    let code = match cli::run_workflow(args, decls, handler.clone()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "run failed before execution");
            handler.emit(OutputEvent::WorkflowError {
                error: format!("{:#}", e),
            });
            1
        }
    };

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
