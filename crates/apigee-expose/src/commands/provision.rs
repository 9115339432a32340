//! Provision command - expose the Apigee runtime.

use std::path::PathBuf;

use anyhow::{Context, Result};
use apigee_expose::config::{
    DEFAULT_ENVIRONMENT, DEFAULT_ENVIRONMENT_GROUP, DEFAULT_JSON_QUERY_TOOL, DEFAULT_PREFIX,
};
use apigee_expose::testsuite::DEFAULT_TEST_COMMAND;
use apigee_expose::waiter::{
    CERTIFICATE_POLL_INTERVAL_SECS, CERTIFICATE_TIMEOUT_SECS, MAX_QUERY_FAILURES,
    OPERATION_POLL_INTERVAL_SECS, OPERATION_TIMEOUT_SECS,
};
use apigee_expose::{ui, ExposeConfig, Provisioner, TestSuite, WaitPolicy};
use clap::Args;

use super::ConnectionArgs;

/// Provision the load balancer in front of an Apigee instance.
#[derive(Args, Debug, Clone)]
pub struct ProvisionCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// VPC network peered with Apigee.
    #[arg(long, env = "NETWORK")]
    pub network: Option<String>,

    /// Subnetwork for the PSC network endpoint group.
    #[arg(long, env = "SUBNET")]
    pub subnet: Option<String>,

    /// Region for regional resources (defaults to the instance location).
    #[arg(long, env = "REGION")]
    pub region: Option<String>,

    /// Apigee instance (defaults to the organization's first instance).
    #[arg(long, env = "APIGEE_INSTANCE")]
    pub instance: Option<String>,

    /// Environment to create.
    #[arg(long, env = "APIGEE_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Environment group to create.
    #[arg(long, env = "APIGEE_ENV_GROUP", default_value = DEFAULT_ENVIRONMENT_GROUP)]
    pub environment_group: String,

    /// Prefix for load balancer resource names.
    #[arg(long, env = "RESOURCE_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Hostname to serve (defaults to `<ip>.nip.io`).
    #[arg(long, env = "RUNTIME_HOSTNAME")]
    pub hostname: Option<String>,

    /// Path used in the verification request.
    #[arg(long, env = "BASE_PATH", default_value = "")]
    pub base_path: String,

    /// JSON query tool that must be installed.
    #[arg(long, env = "JSON_QUERY_TOOL", default_value = DEFAULT_JSON_QUERY_TOOL)]
    pub json_tool: String,

    /// Seconds between operation polls.
    #[arg(
        long,
        default_value_t = OPERATION_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Seconds to wait for each operation.
    #[arg(
        long,
        default_value_t = OPERATION_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub operation_timeout: u64,

    /// Seconds between certificate polls.
    #[arg(
        long,
        default_value_t = CERTIFICATE_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub certificate_interval: u64,

    /// Seconds to wait for the certificate (0 waits indefinitely).
    #[arg(long, default_value_t = CERTIFICATE_TIMEOUT_SECS)]
    pub certificate_timeout: u64,

    /// Consecutive failed status queries tolerated.
    #[arg(long, default_value_t = MAX_QUERY_FAILURES)]
    pub max_query_failures: u32,

    /// Skip the integration tests.
    #[arg(long)]
    pub skip_tests: bool,

    /// Integration test command.
    #[arg(long, env = "TEST_COMMAND", default_value = DEFAULT_TEST_COMMAND)]
    pub test_command: String,

    /// Directory to run the integration tests from.
    #[arg(long, value_name = "DIR")]
    pub test_dir: Option<PathBuf>,

    /// Write a JSON report of the provisioned resources, also on failure.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl ProvisionCommand {
    /// Run the provision command.
    ///
    /// # Errors
    ///
    /// Returns an error if any provisioning step fails.
    pub async fn run(&self) -> Result<()> {
        ui::print_banner();
        ui::print_section("Provisioning Apigee external access");

        let provisioner = self.provisioner()?;
        let connection = self.connection.clone();
        let report = provisioner
            .run(move || async move { connection.connect().await })
            .await
            .with_context(|| {
                format!(
                    "failed to expose Apigee in project {}",
                    self.connection.project()
                )
            })?;

        ui::print_report_summary(&report);
        ui::print_verification_instructions(&report.verification_command(&self.base_path)?);
        Ok(())
    }

    /// Build the provisioner from the arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the test command is empty or a wait setting is invalid.
    pub fn provisioner(&self) -> Result<Provisioner> {
        let mut provisioner = Provisioner::new(self.config())
            .with_operation_policy(WaitPolicy::bounded_from_secs(
                self.poll_interval,
                self.operation_timeout,
                self.max_query_failures,
            )?)
            .with_certificate_policy(WaitPolicy::from_secs(
                self.certificate_interval,
                self.certificate_timeout,
                self.max_query_failures,
            )?);

        for tool in self.connection.required_tools() {
            provisioner = provisioner.with_required_tool(tool);
        }

        if let Some(path) = &self.report {
            provisioner = provisioner.with_report_path(path);
        }

        if !self.skip_tests {
            let mut suite = TestSuite::parse(&self.test_command)?;
            if let Some(dir) = &self.test_dir {
                suite = suite.in_dir(dir);
            }
            provisioner = provisioner.with_test_suite(suite);
        }

        Ok(provisioner)
    }

    fn config(&self) -> ExposeConfig {
        let mut config = ExposeConfig::with_defaults(
            self.connection.project(),
            self.network.clone().unwrap_or_default(),
            self.subnet.clone().unwrap_or_default(),
        );
        config.instance.clone_from(&self.instance);
        config.region.clone_from(&self.region);
        config.environment.clone_from(&self.environment);
        config.environment_group.clone_from(&self.environment_group);
        config.prefix.clone_from(&self.prefix);
        config.hostname.clone_from(&self.hostname);
        config.base_path.clone_from(&self.base_path);
        config.json_query_tool.clone_from(&self.json_tool);
        config
    }
}
