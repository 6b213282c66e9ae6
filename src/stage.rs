//! External-command stage runner.
//!
//! Each delegated pipeline stage is one invocation of an external process
//! with inherited stdio. No retries: a non-zero exit is surfaced as a fatal
//! error to the caller.

use crate::error::{PipelineError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// One external pipeline stage: a program plus its arguments.
#[derive(Debug, Clone)]
pub struct ExternalStage {
    name: &'static str,
    program: String,
    args: Vec<String>,
}

impl ExternalStage {
    /// Build a stage from a configured command line (program + fixed args).
    pub fn new(name: &'static str, command_line: &[String]) -> Result<Self> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| PipelineError::Config(format!("{} command is empty", name)))?;

        Ok(Self {
            name,
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Append an argument to the configured command line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The stage's display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the stage to completion in `cwd`, inheriting stdout/stderr so the
    /// external tool's own diagnostics reach the user.
    pub async fn run(&self, cwd: &Path) -> Result<()> {
        info!(stage = self.name, program = %self.program, "running external stage");
        debug!(args = ?self.args, cwd = %cwd.display(), "stage command line");

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if !cwd.as_os_str().is_empty() {
            command.current_dir(cwd);
        }

        let status = command.status().await.map_err(|e| PipelineError::Spawn {
            stage: self.name,
            command: self.program.clone(),
            source: e,
        })?;

        if !status.success() {
            return Err(PipelineError::StageFailed {
                stage: self.name,
                status,
            });
        }

        Ok(())
    }
}
