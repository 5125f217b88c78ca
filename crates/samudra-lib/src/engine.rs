//! Engines hosted as external programs.
//!
//! Protocol: the program runs with the workspace as its working directory and
//! receives its parameters as one JSON object on stdin. Anything it prints on
//! stdout is parsed as the JSON result object. Exit status
//! [`INVALID_INPUT_EXIT_CODE`] means the parameters were rejected and stderr
//! carries the reason; any other non-zero status is an internal failure.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::{OptimizerParams, PathfinderParams};
use crate::stages::{EngineError, OptimizerEngine, PathfindingEngine};

/// Exit status an engine uses to reject its input.
pub const INVALID_INPUT_EXIT_CODE: i32 = 2;

/// Environment variable naming the optimizer's auxiliary output directory.
pub const OUTPUT_DIR_ENV: &str = "SAMUDRA_OUTPUT_DIR";

/// An engine implemented by an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full argv; the first element is the program.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::Config {
            message: "engine command must not be empty".to_string(),
        })?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn invoke<P: Serialize>(
        &self,
        workspace: &Path,
        params: &P,
        output_dir: Option<&Path>,
    ) -> std::result::Result<Value, EngineError> {
        let payload = serde_json::to_vec(params)
            .map_err(|err| EngineError::Failed(format!("failed to encode parameters: {err}")))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(workspace)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = output_dir {
            // The child runs inside the workspace, so a relative path would
            // resolve against the wrong directory.
            let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
            command.env(OUTPUT_DIR_ENV, dir);
        }

        debug!(program = %self.program, workspace = %workspace.display(), "spawning engine");
        let mut child = command
            .spawn()
            .map_err(|err| {
                EngineError::Failed(format!("failed to start {}: {err}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload) {
                Ok(()) => {}
                // The engine exited without reading its parameters; its exit
                // status below decides the outcome.
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    debug!(program = %self.program, "engine closed stdin early");
                }
                Err(err) => {
                    return Err(EngineError::Failed(format!(
                        "failed to send parameters to {}: {err}",
                        self.program
                    )))
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| {
                EngineError::Failed(format!("failed to wait for {}: {err}", self.program))
            })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(INVALID_INPUT_EXIT_CODE) => EngineError::InvalidInput(if stderr.is_empty() {
                    "invalid input".to_string()
                } else {
                    stderr
                }),
                Some(code) => EngineError::Failed(format!(
                    "{} exited with status {code}: {stderr}",
                    self.program
                )),
                None => EngineError::Failed(format!(
                    "{} was terminated by a signal: {stderr}",
                    self.program
                )),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(stdout).map_err(|err| {
            EngineError::Failed(format!("{} printed invalid JSON: {err}", self.program))
        })
    }
}

impl PathfindingEngine for CommandEngine {
    fn find_paths(
        &self,
        workspace: &Path,
        params: &PathfinderParams,
    ) -> std::result::Result<Value, EngineError> {
        self.invoke(workspace, params, None)
    }
}

impl OptimizerEngine for CommandEngine {
    fn optimize(
        &self,
        workspace: &Path,
        output_dir: &Path,
        params: &OptimizerParams,
    ) -> std::result::Result<(), EngineError> {
        self.invoke(workspace, params, Some(output_dir)).map(|_| ())
    }
}
