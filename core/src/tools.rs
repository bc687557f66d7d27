//! Abstraction over the external OpenFst-like tool pipeline
//! (`fstcompile | fstcompose | fstshortestpath | ...`). The core only
//! produces/consumes text; it never reimplements determinization,
//! composition or shortest-path search itself.
use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::error::ToolError;

/// One pipeline stage: a program name plus its arguments.
pub type ToolStage = (String, Vec<String>);

/// Runs a chain of external tools, piping stdout of each stage into stdin
/// of the next, and returns the final stage's stdout.
pub trait ToolRunner {
    fn run_pipeline(&self, stages: &[ToolStage], input: &[u8]) -> Result<Vec<u8>, ToolError>;
}

/// Builds a [`ToolStage`] from a program name and its string arguments.
pub fn stage(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> ToolStage {
    (program.into(), args.into_iter().map(Into::into).collect())
}

/// Real [`ToolRunner`] backed by `std::process::Command`. Blocking, per the
/// "await all child exits" contract: each stage is spawned, fed its input,
/// and its stdout collected before the next stage starts.
#[derive(Debug, Default, Clone)]
pub struct ProcessToolRunner;

impl ProcessToolRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessToolRunner {
    fn run_pipeline(&self, stages: &[ToolStage], input: &[u8]) -> Result<Vec<u8>, ToolError> {
        let mut data = input.to_vec();

        for (program, args) in stages {
            let mut child = Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| ToolError {
                    program: program.clone(),
                    status: -1,
                    stderr: e.to_string(),
                })?;

            child
                .stdin
                .take()
                .expect("stdin was piped")
                .write_all(&data)
                .map_err(|e| ToolError {
                    program: program.clone(),
                    status: -1,
                    stderr: e.to_string(),
                })?;

            let output = child.wait_with_output().map_err(|e| ToolError {
                program: program.clone(),
                status: -1,
                stderr: e.to_string(),
            })?;

            if !output.status.success() {
                return Err(ToolError {
                    program: program.clone(),
                    status: output.status.code().unwrap_or(-1),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                });
            }

            data = output.stdout;
        }

        Ok(data)
    }
}

/// Test-only [`ToolRunner`] that returns scripted outputs instead of
/// spawning real processes, so `core::resolver` can be tested without the
/// OpenFst toolchain installed.
#[cfg(any(test, feature = "test-util"))]
pub struct MockToolRunner {
    pub responses: std::cell::RefCell<Vec<Result<Vec<u8>, ToolError>>>,
}

#[cfg(any(test, feature = "test-util"))]
impl MockToolRunner {
    pub fn new(responses: Vec<Result<Vec<u8>, ToolError>>) -> Self {
        Self {
            responses: std::cell::RefCell::new(responses),
        }
    }

    pub fn once(response: Result<Vec<u8>, ToolError>) -> Self {
        Self::new(vec![response])
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ToolRunner for MockToolRunner {
    fn run_pipeline(&self, _stages: &[ToolStage], _input: &[u8]) -> Result<Vec<u8>, ToolError> {
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            panic!("MockToolRunner ran out of scripted responses");
        }
        responses.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_tool_runner_returns_scripted_output() {
        let runner = MockToolRunner::once(Ok(b"0 1 a a\n1\n".to_vec()));
        let out = runner.run_pipeline(&[stage("fstcompile", Vec::<String>::new())], b"input").unwrap();
        assert_eq!(out, b"0 1 a a\n1\n");
    }

    #[test]
    fn mock_tool_runner_surfaces_scripted_error() {
        let runner = MockToolRunner::once(Err(ToolError {
            program: "fstcompose".to_string(),
            status: 1,
            stderr: "bad fst".to_string(),
        }));
        let err = runner
            .run_pipeline(&[stage("fstcompose", Vec::<String>::new())], b"input")
            .unwrap_err();
        assert_eq!(err.program, "fstcompose");
    }
}
