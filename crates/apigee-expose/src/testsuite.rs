//! Integration test suite run against the provisioned endpoint.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use crate::error::ExposeError;
use crate::validator::RequiredTool;

/// Default test command.
pub const DEFAULT_TEST_COMMAND: &str = "npm run test";

/// An external test command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl TestSuite {
    /// Create a test suite from a program and its arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Parse a whitespace-separated command line.
    ///
    /// # Errors
    /// Returns error if the command is empty.
    pub fn parse(command: &str) -> Result<Self, ExposeError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ExposeError::Config("test command must not be empty".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Run the suite from `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The program must be installed for the suite to run.
    #[must_use]
    pub fn required_tool(&self) -> RequiredTool {
        RequiredTool::new(
            self.program.clone(),
            format!("Install {} or pass --skip-tests", self.program),
        )
    }

    /// The command line as typed.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the suite with `TEST_HOST` and `APIGEE_ENV` exported.
    ///
    /// # Errors
    /// Returns error if the command cannot be started or exits unsuccessfully.
    pub async fn run(&self, host: &str, environment: &str) -> Result<(), ExposeError> {
        let command_line = self.command_line();
        info!(command = %command_line, host = %host, "Running integration tests");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("TEST_HOST", host)
            .env("APIGEE_ENV", environment);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command.status().await.map_err(|e| ExposeError::Command {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ExposeError::Command {
                command: command_line,
                message: format!("exited with {status}"),
            })
        }
    }
}
