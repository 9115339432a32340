//! Precondition checks run before any control-plane call.

use colored::Colorize;

use crate::config::ExposeConfig;
use crate::error::ExposeError;
use crate::ui;

/// An executable that must be on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredTool {
    /// Program name.
    pub program: String,
    /// Shown when the program is missing.
    pub install_instructions: String,
}

impl RequiredTool {
    /// Create a tool requirement.
    #[must_use]
    pub fn new(program: impl Into<String>, install_instructions: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            install_instructions: install_instructions.into(),
        }
    }

    /// The JSON query tool.
    #[must_use]
    pub fn json_query(program: &str) -> Self {
        Self::new(program, "Install jq from https://jqlang.github.io/jq/download/")
    }

    /// The Google Cloud SDK, used to mint an access token.
    #[must_use]
    pub fn gcloud() -> Self {
        Self::new(
            "gcloud",
            "Install the Google Cloud SDK from https://cloud.google.com/sdk/docs/install or pass --access-token",
        )
    }
}

struct Requirement {
    name: String,
    check: Box<dyn Fn() -> bool + Send + Sync>,
    instructions: String,
}

/// Validates prerequisites for provisioning.
pub struct PrerequisitesValidator {
    requirements: Vec<Requirement>,
}

impl PrerequisitesValidator {
    /// Checks for the required settings of `config` and the given tools.
    #[must_use]
    pub fn new(config: &ExposeConfig, tools: &[RequiredTool]) -> Self {
        let mut requirements = Vec::new();

        for (variable, value) in config.required_variables() {
            let present = !value.trim().is_empty();
            requirements.push(Requirement {
                name: variable.to_string(),
                check: Box::new(move || present),
                instructions: format!("Set the {variable} environment variable"),
            });
        }

        for tool in tools {
            let program = tool.program.clone();
            requirements.push(Requirement {
                name: tool.program.clone(),
                check: Box::new(move || which::which(&program).is_ok()),
                instructions: tool.install_instructions.clone(),
            });
        }

        Self { requirements }
    }

    /// Run every check and print the results.
    ///
    /// # Errors
    /// Returns [`ExposeError::Prerequisite`] naming every failed check.
    pub fn validate(&self) -> Result<(), ExposeError> {
        println!();
        let mut failures = Vec::new();

        for requirement in &self.requirements {
            let passed = (requirement.check)();
            ui::print_check_result(&requirement.name, passed, None);
            if !passed {
                failures.push(requirement);
            }
        }

        println!();

        if failures.is_empty() {
            ui::print_success("All prerequisites met!");
            return Ok(());
        }

        ui::print_warning("Some prerequisites are not met:");
        println!();
        for failure in &failures {
            println!(
                "  {} {} - {}",
                "✗".red(),
                failure.name.red(),
                failure.instructions.bright_black()
            );
        }
        println!();

        Err(ExposeError::Prerequisite(
            failures
                .iter()
                .map(|f| format!("{} ({})", f.name, f.instructions))
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variables_are_reported() {
        let config = ExposeConfig::with_defaults("my-proj", " ", "");
        let err = PrerequisitesValidator::new(&config, &[]).validate().unwrap_err();

        let message = err.to_string();
        assert!(message.contains("NETWORK"));
        assert!(message.contains("SUBNET"));
        assert!(!message.contains("PROJECT"));
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let config = ExposeConfig::with_defaults("my-proj", "default", "psc");
        let tools = [RequiredTool::json_query("jq-not-installed-anywhere")];
        let err = PrerequisitesValidator::new(&config, &tools)
            .validate()
            .unwrap_err();

        assert!(matches!(err, ExposeError::Prerequisite(ref m) if m.contains("jq-not-installed-anywhere")));
    }

    #[test]
    fn test_all_present() {
        let config = ExposeConfig::with_defaults("my-proj", "default", "psc");
        let tools = [RequiredTool::new("sh", "part of every POSIX system")];
        assert!(PrerequisitesValidator::new(&config, &tools).validate().is_ok());
    }
}
