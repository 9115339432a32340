//! Control-plane trait and common types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExposeError;

// ============================================================================
// Operation types
// ============================================================================

/// Handle to a long-running operation returned by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationRef {
    /// Apigee operation, looked up by organization and operation ID.
    Apigee {
        /// Operation ID (last segment of the operation name).
        id: String,
    },
    /// Compute Engine operation, looked up through its self link.
    Compute {
        /// Fully qualified operation URL.
        self_link: String,
    },
}

impl OperationRef {
    /// Build an Apigee reference from a full operation name or a bare ID.
    #[must_use]
    pub fn apigee(name: &str) -> Self {
        let id = name.rsplit('/').next().unwrap_or(name);
        Self::Apigee { id: id.to_string() }
    }

    /// Short identifier for logs and diagnostics.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Apigee { id } => id,
            Self::Compute { self_link } => self_link.rsplit('/').next().unwrap_or(self_link),
        }
    }
}

impl std::fmt::Display for OperationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apigee { id } => write!(f, "apigee operation {id}"),
            Self::Compute { .. } => write!(f, "compute operation {}", self.id()),
        }
    }
}

impl std::str::FromStr for OperationRef {
    type Err = ExposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ExposeError::Config(
                "operation identifier must not be empty".to_string(),
            ));
        }
        if s.starts_with("https://") || s.starts_with("http://") {
            Ok(Self::Compute {
                self_link: s.to_string(),
            })
        } else {
            Ok(Self::apigee(s))
        }
    }
}

/// Lifecycle state of an operation, normalised across APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Accepted but not started.
    NotStarted,
    /// In progress.
    InProgress,
    /// Terminal.
    Finished,
    /// Anything the API reports that we don't recognise.
    Unknown,
}

impl OperationState {
    /// Map an Apigee `metadata.state` value.
    #[must_use]
    pub fn from_apigee(state: &str) -> Self {
        match state {
            "NOT_STARTED" => Self::NotStarted,
            "IN_PROGRESS" => Self::InProgress,
            "FINISHED" => Self::Finished,
            _ => Self::Unknown,
        }
    }

    /// Map a Compute Engine operation `status` value.
    #[must_use]
    pub fn from_compute(status: &str) -> Self {
        match status {
            "PENDING" => Self::NotStarted,
            "RUNNING" => Self::InProgress,
            "DONE" => Self::Finished,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Observed state of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Which operation this is.
    pub reference: OperationRef,
    /// Current state.
    pub state: OperationState,
    /// Error reported by the API, if the operation failed.
    pub error: Option<String>,
}

impl Operation {
    /// Whether the operation reached its terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == OperationState::Finished
    }
}

// ============================================================================
// Resource types
// ============================================================================

/// An Apigee runtime instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApigeeInstance {
    /// Instance name.
    pub name: String,
    /// Region the instance runs in.
    pub location: String,
    /// Private IP of the runtime.
    pub host: Option<String>,
    /// PSC service attachment published by the instance.
    pub service_attachment: Option<String>,
}

/// A reserved global IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Address resource name.
    pub name: String,
    /// The IPv4 address, once allocated.
    pub address: Option<String>,
    /// Reservation status (`RESERVING`, `RESERVED`, `IN_USE`).
    pub status: String,
}

/// Managed certificate provisioning status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    /// Domain validation in progress.
    Provisioning,
    /// Certificate issued.
    Active,
    /// Failed, will be retried by the provider.
    ProvisioningFailed,
    /// Failed and will not be retried.
    ProvisioningFailedPermanently,
    /// Renewal failed.
    RenewalFailed,
    /// Unknown status.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provisioning => write!(f, "PROVISIONING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::ProvisioningFailed => write!(f, "PROVISIONING_FAILED"),
            Self::ProvisioningFailedPermanently => write!(f, "PROVISIONING_FAILED_PERMANENTLY"),
            Self::RenewalFailed => write!(f, "RENEWAL_FAILED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A Google-managed SSL certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslCertificate {
    /// Certificate resource name.
    pub name: String,
    /// Managed provisioning status.
    pub status: CertificateStatus,
    /// Domains covered by the certificate.
    pub domains: Vec<String>,
}

/// Request to create a Private Service Connect network endpoint group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PscNegRequest {
    /// NEG name.
    pub name: String,
    /// Region of the NEG (same as the Apigee instance).
    pub region: String,
    /// VPC network name.
    pub network: String,
    /// Subnetwork name.
    pub subnet: String,
    /// Service attachment the NEG connects to.
    pub target_service: String,
}

/// Remote control plane that creates resources and reports on operations.
///
/// Every mutation returns a handle to the long-running operation it started;
/// callers hand it to [`crate::waiter::wait_for_operation`].
#[async_trait]
pub trait ControlPlane: Send + Sync {
    // ========================================================================
    // Operations
    // ========================================================================

    /// Look up the current state of an operation.
    async fn get_operation(&self, operation: &OperationRef) -> Result<Operation, ExposeError>;

    // ========================================================================
    // Apigee
    // ========================================================================

    /// List the organization's runtime instances.
    async fn list_instances(&self) -> Result<Vec<ApigeeInstance>, ExposeError>;

    /// Get a runtime instance by name.
    async fn get_instance(&self, name: &str) -> Result<ApigeeInstance, ExposeError>;

    /// Create an environment.
    async fn create_environment(&self, name: &str) -> Result<OperationRef, ExposeError>;

    /// Attach an environment to a runtime instance.
    async fn attach_environment_to_instance(
        &self,
        instance: &str,
        environment: &str,
    ) -> Result<OperationRef, ExposeError>;

    /// Create an environment group serving the given hostnames.
    async fn create_environment_group(
        &self,
        name: &str,
        hostnames: &[String],
    ) -> Result<OperationRef, ExposeError>;

    /// Attach an environment to an environment group.
    async fn attach_environment_to_group(
        &self,
        group: &str,
        environment: &str,
    ) -> Result<OperationRef, ExposeError>;

    // ========================================================================
    // Compute Engine
    // ========================================================================

    /// Reserve a global external IPv4 address.
    async fn reserve_global_address(&self, name: &str) -> Result<OperationRef, ExposeError>;

    /// Get a reserved global address.
    async fn get_global_address(&self, name: &str) -> Result<Address, ExposeError>;

    /// Create a Google-managed SSL certificate.
    async fn create_managed_certificate(
        &self,
        name: &str,
        domains: &[String],
    ) -> Result<OperationRef, ExposeError>;

    /// Get an SSL certificate.
    async fn get_ssl_certificate(&self, name: &str) -> Result<SslCertificate, ExposeError>;

    /// Create a PSC network endpoint group.
    async fn create_psc_neg(&self, req: &PscNegRequest) -> Result<OperationRef, ExposeError>;

    /// Create a global external managed HTTPS backend service.
    async fn create_backend_service(&self, name: &str) -> Result<OperationRef, ExposeError>;

    /// Add a regional NEG as a backend of a backend service.
    async fn add_backend(
        &self,
        backend_service: &str,
        neg: &str,
        region: &str,
    ) -> Result<OperationRef, ExposeError>;

    /// Create a URL map routing everything to one backend service.
    async fn create_url_map(
        &self,
        name: &str,
        default_service: &str,
    ) -> Result<OperationRef, ExposeError>;

    /// Create a target HTTPS proxy.
    async fn create_https_proxy(
        &self,
        name: &str,
        url_map: &str,
        certificate: &str,
    ) -> Result<OperationRef, ExposeError>;

    /// Create a global forwarding rule on port 443.
    async fn create_forwarding_rule(
        &self,
        name: &str,
        address: &str,
        proxy: &str,
    ) -> Result<OperationRef, ExposeError>;
}
