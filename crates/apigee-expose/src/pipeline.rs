//! Provisioning sequence.
//!
//! Each step is a function returning a `Result`; [`Provisioner::run`] runs
//! them in order and stops at the first failure. Nothing is rolled back:
//! resources created before the failing step are left in place.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;

use crate::config::ExposeConfig;
use crate::control_plane::{ControlPlane, OperationRef, PscNegRequest};
use crate::error::ExposeError;
use crate::testsuite::TestSuite;
use crate::ui;
use crate::validator::{PrerequisitesValidator, RequiredTool};
use crate::waiter::{wait_for_certificate, wait_for_operation, WaitPolicy};

/// Provisioning steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    /// Checking environment variables and tools.
    ValidatingPrerequisites,
    /// Looking up the Apigee instance and its service attachment.
    ResolvingInstance,
    /// Creating the Apigee environment.
    CreatingEnvironment,
    /// Attaching the environment to the instance.
    AttachingEnvironmentToInstance,
    /// Reserving the global IP address.
    ReservingAddress,
    /// Creating the environment group.
    CreatingEnvironmentGroup,
    /// Attaching the environment to the group.
    AttachingEnvironmentToGroup,
    /// Creating the managed SSL certificate.
    CreatingCertificate,
    /// Creating the PSC network endpoint group.
    CreatingNetworkEndpointGroup,
    /// Creating the backend service.
    CreatingBackendService,
    /// Adding the NEG as backend.
    AddingBackend,
    /// Creating the URL map.
    CreatingUrlMap,
    /// Creating the target HTTPS proxy.
    CreatingHttpsProxy,
    /// Creating the forwarding rule.
    CreatingForwardingRule,
    /// Waiting for the certificate to become active.
    WaitingCertificate,
    /// Running the integration tests.
    RunningTests,
    /// Done.
    Complete,
}

impl ProvisionStep {
    /// Every step in execution order.
    pub const ALL: [Self; 17] = [
        Self::ValidatingPrerequisites,
        Self::ResolvingInstance,
        Self::CreatingEnvironment,
        Self::AttachingEnvironmentToInstance,
        Self::ReservingAddress,
        Self::CreatingEnvironmentGroup,
        Self::AttachingEnvironmentToGroup,
        Self::CreatingCertificate,
        Self::CreatingNetworkEndpointGroup,
        Self::CreatingBackendService,
        Self::AddingBackend,
        Self::CreatingUrlMap,
        Self::CreatingHttpsProxy,
        Self::CreatingForwardingRule,
        Self::WaitingCertificate,
        Self::RunningTests,
        Self::Complete,
    ];

    /// Total number of steps.
    #[allow(clippy::cast_possible_truncation)]
    pub const TOTAL_STEPS: u8 = Self::ALL.len() as u8;

    /// Get a human-readable description of the step.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ValidatingPrerequisites => "Validating prerequisites",
            Self::ResolvingInstance => "Resolving Apigee instance",
            Self::CreatingEnvironment => "Creating Apigee environment",
            Self::AttachingEnvironmentToInstance => "Attaching environment to instance",
            Self::ReservingAddress => "Reserving global IP address",
            Self::CreatingEnvironmentGroup => "Creating environment group",
            Self::AttachingEnvironmentToGroup => "Attaching environment to group",
            Self::CreatingCertificate => "Creating managed SSL certificate",
            Self::CreatingNetworkEndpointGroup => "Creating PSC network endpoint group",
            Self::CreatingBackendService => "Creating backend service",
            Self::AddingBackend => "Adding network endpoint group to backend service",
            Self::CreatingUrlMap => "Creating URL map",
            Self::CreatingHttpsProxy => "Creating target HTTPS proxy",
            Self::CreatingForwardingRule => "Creating forwarding rule",
            Self::WaitingCertificate => "Waiting for certificate to become active",
            Self::RunningTests => "Running integration tests",
            Self::Complete => "Complete",
        }
    }

    /// Get the step number for progress display.
    #[must_use]
    pub fn step_number(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .and_then(|i| u8::try_from(i + 1).ok())
            .unwrap_or(0)
    }
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// What was provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionReport {
    /// Project and Apigee organization.
    pub project: String,
    /// Apigee environment.
    pub environment: String,
    /// Environment group.
    pub environment_group: String,
    /// Apigee instance the environment was attached to.
    pub instance: Option<String>,
    /// Region of the regional resources.
    pub region: Option<String>,
    /// Service attachment targeted by the NEG.
    pub service_attachment: Option<String>,
    /// Reserved IP address.
    pub ip_address: Option<String>,
    /// Hostname served by the load balancer.
    pub hostname: Option<String>,
    /// Managed certificate.
    pub certificate: String,
    /// PSC network endpoint group.
    pub network_endpoint_group: String,
    /// Backend service.
    pub backend_service: String,
    /// URL map.
    pub url_map: String,
    /// Target HTTPS proxy.
    pub https_proxy: String,
    /// Forwarding rule.
    pub forwarding_rule: String,
    /// Whether the integration tests ran.
    pub tests_run: bool,
    /// When provisioning started.
    pub started_at: DateTime<Utc>,
    /// When provisioning completed.
    pub finished_at: Option<DateTime<Utc>>,
    /// Step that stopped the run, if any.
    pub failed_step: Option<ProvisionStep>,
}

impl ProvisionReport {
    fn new(config: &ExposeConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            project: config.project.clone(),
            environment: config.environment.clone(),
            environment_group: config.environment_group.clone(),
            instance: None,
            region: None,
            service_attachment: None,
            ip_address: None,
            hostname: None,
            certificate: config.certificate_name(),
            network_endpoint_group: config.neg_name(),
            backend_service: config.backend_service_name(),
            url_map: config.url_map_name(),
            https_proxy: config.https_proxy_name(),
            forwarding_rule: config.forwarding_rule_name(),
            tests_run: false,
            started_at,
            finished_at: None,
            failed_step: None,
        }
    }

    /// URL to send a verification request to.
    ///
    /// # Errors
    /// Returns error if no hostname was assigned or the URL is invalid.
    pub fn verification_url(&self, base_path: &str) -> Result<Url, ExposeError> {
        let hostname = require(self.hostname.as_ref(), "hostname")?;
        let root = Url::parse(&format!("https://{hostname}/"))
            .map_err(|e| ExposeError::Config(format!("invalid hostname {hostname}: {e}")))?;
        root.join(base_path.trim_start_matches('/'))
            .map_err(|e| ExposeError::Config(format!("invalid base path {base_path}: {e}")))
    }

    /// A `curl` command that calls the exposed runtime.
    ///
    /// # Errors
    /// Returns error if the verification URL cannot be built.
    pub fn verification_command(&self, base_path: &str) -> Result<String, ExposeError> {
        Ok(format!("curl -i {}", self.verification_url(base_path)?))
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn write_json(&self, path: &Path) -> Result<(), ExposeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn require<'a>(value: Option<&'a String>, what: &str) -> Result<&'a str, ExposeError> {
    value
        .map(String::as_str)
        .ok_or_else(|| ExposeError::Config(format!("{what} has not been resolved yet")))
}

/// Runs the provisioning steps.
pub struct Provisioner {
    config: ExposeConfig,
    operation_policy: WaitPolicy,
    certificate_policy: WaitPolicy,
    test_suite: Option<TestSuite>,
    extra_tools: Vec<RequiredTool>,
    report_path: Option<PathBuf>,
}

impl Provisioner {
    /// Create a provisioner with default wait policies and no test suite.
    #[must_use]
    pub fn new(config: ExposeConfig) -> Self {
        Self {
            config,
            operation_policy: WaitPolicy::operations(),
            certificate_policy: WaitPolicy::certificates(),
            test_suite: None,
            extra_tools: Vec::new(),
            report_path: None,
        }
    }

    /// Policy for long-running operations.
    #[must_use]
    pub fn with_operation_policy(mut self, policy: WaitPolicy) -> Self {
        self.operation_policy = policy;
        self
    }

    /// Policy for certificate provisioning.
    #[must_use]
    pub fn with_certificate_policy(mut self, policy: WaitPolicy) -> Self {
        self.certificate_policy = policy;
        self
    }

    /// Run `suite` once the endpoint is up.
    #[must_use]
    pub fn with_test_suite(mut self, suite: TestSuite) -> Self {
        self.test_suite = Some(suite);
        self
    }

    /// Require an additional tool.
    #[must_use]
    pub fn with_required_tool(mut self, tool: RequiredTool) -> Self {
        self.extra_tools.push(tool);
        self
    }

    /// Write the report to `path` once the run ends, also when a step fails.
    #[must_use]
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// The configuration being provisioned.
    #[must_use]
    pub fn config(&self) -> &ExposeConfig {
        &self.config
    }

    /// Tools that must be installed.
    #[must_use]
    pub fn required_tools(&self) -> Vec<RequiredTool> {
        let mut tools = vec![RequiredTool::json_query(&self.config.json_query_tool)];
        tools.extend(self.extra_tools.iter().cloned());
        if let Some(suite) = &self.test_suite {
            tools.push(suite.required_tool());
        }
        tools
    }

    /// Check preconditions without touching the control plane.
    ///
    /// # Errors
    /// Returns [`ExposeError::Prerequisite`] when anything is missing.
    pub fn validate(&self) -> Result<(), ExposeError> {
        PrerequisitesValidator::new(&self.config, &self.required_tools()).validate()
    }

    /// Validate, connect, then run every step.
    ///
    /// `connect` is only called once validation passed, so a failed
    /// precondition never reaches the control plane.
    ///
    /// Once the control plane is reached, the report is written to the
    /// configured report path whether or not the run succeeds.
    ///
    /// # Errors
    /// Returns the first error of any step, or the error writing the report
    /// after a successful run.
    pub async fn run<F, Fut>(&self, connect: F) -> Result<ProvisionReport, ExposeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn ControlPlane>, ExposeError>>,
    {
        let started_at = Utc::now();

        let first = ProvisionStep::ValidatingPrerequisites;
        ui::print_progress_step(first.step_number(), ProvisionStep::TOTAL_STEPS, first.description());
        self.validate()?;

        let control_plane = connect().await?;
        let mut report = ProvisionReport::new(&self.config, started_at);

        for step in ProvisionStep::ALL.into_iter().skip(1) {
            ui::print_progress_step(step.step_number(), ProvisionStep::TOTAL_STEPS, step.description());

            if let Err(e) = self
                .execute_step(step, control_plane.as_ref(), &mut report)
                .await
            {
                error!(step = ?step, error = %e, "Provisioning failed");
                ui::print_error(&format!("Provisioning failed at step '{step}': {e}"));
                ui::print_info("Resources created before this step were left in place.");

                report.failed_step = Some(step);
                // Keep the step error; a failed write is only logged.
                if let Err(write_err) = self.save_report(&report) {
                    warn!(error = %write_err, "Failed to write partial provisioning report");
                    ui::print_warning(&format!("Could not write partial report: {write_err}"));
                }
                return Err(e);
            }
        }

        report.finished_at = Some(Utc::now());
        self.save_report(&report)?;
        Ok(report)
    }

    fn save_report(&self, report: &ProvisionReport) -> Result<(), ExposeError> {
        let Some(path) = &self.report_path else {
            return Ok(());
        };
        report.write_json(path)?;
        info!(path = %path.display(), failed_step = ?report.failed_step, "Wrote provisioning report");
        ui::print_info(&format!("Report written to {}", path.display()));
        Ok(())
    }

    /// Execute one step.
    async fn execute_step(
        &self,
        step: ProvisionStep,
        cp: &dyn ControlPlane,
        report: &mut ProvisionReport,
    ) -> Result<(), ExposeError> {
        info!(step = ?step, "Executing step");
        let config = &self.config;

        match step {
            ProvisionStep::ValidatingPrerequisites => {
                // Already validated in run()
            }
            ProvisionStep::ResolvingInstance => self.resolve_instance(cp, report).await?,
            ProvisionStep::CreatingEnvironment => {
                let op = cp.create_environment(&config.environment).await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::AttachingEnvironmentToInstance => {
                let instance = require(report.instance.as_ref(), "instance")?;
                let op = cp
                    .attach_environment_to_instance(instance, &config.environment)
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::ReservingAddress => self.reserve_address(cp, report).await?,
            ProvisionStep::CreatingEnvironmentGroup => {
                let hostname = require(report.hostname.as_ref(), "hostname")?;
                let op = cp
                    .create_environment_group(&config.environment_group, &[hostname.to_string()])
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::AttachingEnvironmentToGroup => {
                let op = cp
                    .attach_environment_to_group(&config.environment_group, &config.environment)
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::CreatingCertificate => {
                let hostname = require(report.hostname.as_ref(), "hostname")?;
                let op = cp
                    .create_managed_certificate(&report.certificate, &[hostname.to_string()])
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::CreatingNetworkEndpointGroup => {
                let req = PscNegRequest {
                    name: report.network_endpoint_group.clone(),
                    region: require(report.region.as_ref(), "region")?.to_string(),
                    network: config.network.clone(),
                    subnet: config.subnet.clone(),
                    target_service: require(
                        report.service_attachment.as_ref(),
                        "instance service attachment",
                    )?
                    .to_string(),
                };
                let op = cp.create_psc_neg(&req).await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::CreatingBackendService => {
                let op = cp.create_backend_service(&report.backend_service).await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::AddingBackend => {
                let region = require(report.region.as_ref(), "region")?;
                let op = cp
                    .add_backend(&report.backend_service, &report.network_endpoint_group, region)
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::CreatingUrlMap => {
                let op = cp
                    .create_url_map(&report.url_map, &report.backend_service)
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::CreatingHttpsProxy => {
                let op = cp
                    .create_https_proxy(&report.https_proxy, &report.url_map, &report.certificate)
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::CreatingForwardingRule => {
                let address = require(report.ip_address.as_ref(), "IP address")?;
                let op = cp
                    .create_forwarding_rule(&report.forwarding_rule, address, &report.https_proxy)
                    .await?;
                self.wait(cp, &op).await?;
            }
            ProvisionStep::WaitingCertificate => {
                ui::print_info("Managed certificates can take up to an hour to provision.");
                wait_for_certificate(cp, &report.certificate, &self.certificate_policy).await?;
            }
            ProvisionStep::RunningTests => match &self.test_suite {
                Some(suite) => {
                    let hostname = require(report.hostname.as_ref(), "hostname")?;
                    suite.run(hostname, &config.environment).await?;
                    report.tests_run = true;
                    ui::print_success("Integration tests passed");
                }
                None => ui::print_info("Integration tests skipped"),
            },
            ProvisionStep::Complete => ui::print_success("Provisioning complete!"),
        }

        Ok(())
    }

    async fn wait(&self, cp: &dyn ControlPlane, op: &OperationRef) -> Result<(), ExposeError> {
        wait_for_operation(cp, op, &self.operation_policy).await?;
        Ok(())
    }

    async fn resolve_instance(
        &self,
        cp: &dyn ControlPlane,
        report: &mut ProvisionReport,
    ) -> Result<(), ExposeError> {
        let instance = match &self.config.instance {
            Some(name) => cp.get_instance(name).await?,
            None => cp.list_instances().await?.into_iter().next().ok_or_else(|| {
                ExposeError::Config(format!(
                    "organization {} has no Apigee instances",
                    self.config.project
                ))
            })?,
        };

        let region = self
            .config
            .region
            .clone()
            .unwrap_or_else(|| instance.location.clone());
        if region.is_empty() {
            return Err(ExposeError::Config(format!(
                "instance {} reports no location; pass --region",
                instance.name
            )));
        }

        info!(instance = %instance.name, region = %region, "Resolved Apigee instance");
        report.instance = Some(instance.name);
        report.region = Some(region);
        report.service_attachment = instance.service_attachment;
        Ok(())
    }

    async fn reserve_address(
        &self,
        cp: &dyn ControlPlane,
        report: &mut ProvisionReport,
    ) -> Result<(), ExposeError> {
        let name = self.config.address_name();
        let op = cp.reserve_global_address(&name).await?;
        self.wait(cp, &op).await?;

        let address = cp.get_global_address(&name).await?;
        let ip = address.address.ok_or_else(|| {
            ExposeError::Config(format!("address {name} has no IP assigned ({})", address.status))
        })?;

        let hostname = self.config.runtime_hostname(&ip);
        info!(ip = %ip, hostname = %hostname, "Reserved address");
        report.ip_address = Some(ip);
        report.hostname = Some(hostname);
        Ok(())
    }
}
