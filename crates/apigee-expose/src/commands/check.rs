//! Check command - validate prerequisites without provisioning.

use anyhow::Result;
use apigee_expose::ui;
use clap::Args;

use super::provision::ProvisionCommand;

/// Check environment variables and tools.
#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    #[command(flatten)]
    pub provision: ProvisionCommand,
}

impl CheckCommand {
    /// Run the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if a prerequisite is missing.
    pub fn run(&self) -> Result<()> {
        ui::print_section("Checking prerequisites");
        self.provision.provisioner()?.validate()?;
        Ok(())
    }
}
