//! Command-line arguments

use super::output::OutputMode;
use crate::workflow::StageDecl;
use clap::parser::ValueSource;
use clap::{ArgMatches, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stagerun", version)]
#[command(about = "Run shell commands in ordered stages with bounded fan-out")]
#[command(
    after_help = "Stages run in the order given. Consecutive --con commands form one \
                  concurrent stage.\n\nExample: stagerun -s 'make deps' -c 'make a' -c 'make b' -s 'make dist'"
)]
pub struct Cli {
    /// Run a command as its own stage
    #[arg(short = 's', long = "seq", value_name = "CMD")]
    pub sequential: Vec<String>,

    /// Run a command concurrently with adjacent --con commands
    #[arg(short = 'c', long = "con", value_name = "CMD")]
    pub concurrent: Vec<String>,

    /// Read newline-delimited commands from stdin as a concurrent group at this position
    #[arg(short = 'i', long = "stdin")]
    pub stdin: bool,

    /// Load stages from a TOML workflow file
    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATH",
        conflicts_with_all = ["sequential", "concurrent", "stdin"]
    )]
    pub file: Option<String>,

    /// Max commands running at once in a concurrent stage [default: 4]
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Working directory for commands and project config
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Do not treat non-zero exit codes as failures (signals still are)
    #[arg(long)]
    pub ignore_exit_codes: bool,

    /// Print the stage plan without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Console)]
    pub output: OutputMode,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Only print errors
    #[arg(long, conflicts_with = "debug")]
    pub quiet: bool,

    /// Also write logs to a file (default location under the config directory)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,
}

impl Cli {
    /// Output mode after applying --quiet
    pub fn output_mode(&self) -> OutputMode {
        if self.quiet {
            OutputMode::Quiet
        } else {
            self.output
        }
    }
}

/// Recover stage declarations in command-line order.
///
/// clap groups values per argument; the argument indices tell us how
/// `--seq`, `--con` and `--stdin` were interleaved.
pub fn stage_decls(matches: &ArgMatches) -> Vec<StageDecl> {
    let mut indexed: Vec<(usize, StageDecl)> = Vec::new();

    if let (Some(indices), Some(values)) = (
        matches.indices_of("sequential"),
        matches.get_many::<String>("sequential"),
    ) {
        indexed.extend(
            indices
                .zip(values)
                .map(|(i, v)| (i, StageDecl::Sequential(v.clone()))),
        );
    }

    if let (Some(indices), Some(values)) = (
        matches.indices_of("concurrent"),
        matches.get_many::<String>("concurrent"),
    ) {
        indexed.extend(
            indices
                .zip(values)
                .map(|(i, v)| (i, StageDecl::Concurrent(v.clone()))),
        );
    }

    if matches.value_source("stdin") == Some(ValueSource::CommandLine) {
        if let Some(i) = matches.index_of("stdin") {
            indexed.push((i, StageDecl::Stdin));
        }
    }

    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, decl)| decl).collect()
}
