//! Assemble a normalized workflow from ordered stage declarations

use super::model::{Command, Stage, Workflow, WorkflowError};
use std::io::BufRead;
use thiserror::Error;

/// Errors while building a workflow from declarations
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read commands from stdin: {0}")]
    Stdin(#[from] std::io::Error),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// A stage declaration, in the order the user wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDecl {
    /// One command that runs on its own
    Sequential(String),
    /// One command that may run alongside its neighbours
    Concurrent(String),
    /// Newline-delimited commands read from stdin, run as a concurrent group
    Stdin,
}

/// Read newline-delimited commands, trimming each line and dropping blanks
pub fn read_commands<R: BufRead>(reader: R) -> Result<Vec<Command>, std::io::Error> {
    let mut commands = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            commands.push(Command::new(trimmed));
        }
    }
    Ok(commands)
}

/// Build a workflow, reading stdin from the given reader when a
/// [`StageDecl::Stdin`] declaration is present.
///
/// Consecutive concurrent declarations (including stdin groups) merge into
/// one concurrent stage. Stdin is read at most once.
pub fn build_workflow<R: BufRead>(
    decls: &[StageDecl],
    stdin: R,
) -> Result<Workflow, BuildError> {
    let mut stages: Vec<Stage> = Vec::new();
    let mut pending: Vec<Command> = Vec::new();
    let mut stdin = Some(stdin);

    for decl in decls {
        match decl {
            StageDecl::Sequential(cmd) => {
                flush(&mut stages, &mut pending);
                stages.push(Stage::Sequential(Command::new(cmd.clone())));
            }
            StageDecl::Concurrent(cmd) => pending.push(Command::new(cmd.clone())),
            StageDecl::Stdin => match stdin.take() {
                Some(reader) => {
                    let commands = read_commands(reader)?;
                    if commands.is_empty() {
                        tracing::warn!("no commands read from stdin");
                    }
                    tracing::debug!(count = commands.len(), "read commands from stdin");
                    pending.extend(commands);
                }
                None => tracing::warn!("stdin already consumed, ignoring repeated --stdin"),
            },
        }
    }
    flush(&mut stages, &mut pending);

    Ok(Workflow::new(stages)?)
}

fn flush(stages: &mut Vec<Stage>, pending: &mut Vec<Command>) {
    if !pending.is_empty() {
        stages.push(Stage::Concurrent(std::mem::take(pending)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn no_stdin() -> Cursor<&'static [u8]> {
        Cursor::new(&b""[..])
    }

    fn seq(s: &str) -> StageDecl {
        StageDecl::Sequential(s.into())
    }

    fn con(s: &str) -> StageDecl {
        StageDecl::Concurrent(s.into())
    }

    #[test]
    fn test_consecutive_concurrent_merge() {
        let decls = vec![seq("a"), con("b"), con("c"), con("d"), seq("e")];
        let wf = build_workflow(&decls, no_stdin()).unwrap();

        assert_eq!(
            wf.stages(),
            &[
                Stage::Sequential("a".into()),
                Stage::Concurrent(vec!["b".into(), "c".into(), "d".into()]),
                Stage::Sequential("e".into()),
            ]
        );
    }

    #[test]
    fn test_sequential_splits_concurrent_groups() {
        let decls = vec![con("a"), seq("b"), con("c")];
        let wf = build_workflow(&decls, no_stdin()).unwrap();
        assert_eq!(wf.len(), 3);
        assert_eq!(wf.stages()[0], Stage::Concurrent(vec!["a".into()]));
        assert_eq!(wf.stages()[2], Stage::Concurrent(vec!["c".into()]));
    }

    #[test]
    fn test_stdin_lines_trimmed_and_blank_dropped() {
        let input = Cursor::new("  echo one  \n\n   \necho two\n");
        let decls = vec![seq("start"), StageDecl::Stdin, seq("end")];
        let wf = build_workflow(&decls, input).unwrap();

        assert_eq!(
            wf.stages()[1],
            Stage::Concurrent(vec!["echo one".into(), "echo two".into()])
        );
    }

    #[test]
    fn test_stdin_merges_with_adjacent_concurrent() {
        let input = Cursor::new("b\nc\n");
        let decls = vec![con("a"), StageDecl::Stdin, con("d")];
        let wf = build_workflow(&decls, input).unwrap();

        assert_eq!(
            wf.stages(),
            &[Stage::Concurrent(vec![
                "a".into(),
                "b".into(),
                "c".into(),
                "d".into()
            ])]
        );
    }

    #[test]
    fn test_empty_stdin_contributes_nothing() {
        let decls = vec![seq("a"), StageDecl::Stdin, seq("b")];
        let wf = build_workflow(&decls, no_stdin()).unwrap();
        assert_eq!(wf.len(), 2);
    }

    #[test]
    fn test_empty_input_is_construction_error() {
        let err = build_workflow(&[], no_stdin()).unwrap_err();
        assert!(matches!(err, BuildError::Workflow(WorkflowError::Empty)));

        let err = build_workflow(&[StageDecl::Stdin], Cursor::new("\n  \n")).unwrap_err();
        assert!(matches!(err, BuildError::Workflow(WorkflowError::Empty)));
    }

    #[test]
    fn test_read_commands() {
        let cmds = read_commands(Cursor::new("a\r\n b \n\n")).unwrap();
        assert_eq!(cmds, vec![Command::new("a"), Command::new("b")]);
    }
}
