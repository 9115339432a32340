//! Apigee and Compute Engine request and response models.

use serde::{Deserialize, Serialize};

// ============================================================================
// Apigee types
// ============================================================================

/// Apigee long-running operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApigeeOperation {
    /// Full operation name (`organizations/{org}/operations/{id}`).
    pub name: String,
    /// Operation metadata.
    pub metadata: Option<ApigeeOperationMetadata>,
    /// Whether the operation is done.
    #[serde(default)]
    pub done: bool,
    /// Error status, set when the operation failed.
    pub error: Option<RpcStatus>,
}

/// Apigee operation metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApigeeOperationMetadata {
    /// Lifecycle state (`NOT_STARTED`, `IN_PROGRESS`, `FINISHED`).
    #[serde(default)]
    pub state: String,
    /// Operation type (`INSERT`, `DELETE`, ...).
    pub operation_type: Option<String>,
    /// Target resource URI.
    pub target_resource_name: Option<String>,
}

/// `google.rpc.Status` error payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcStatus {
    /// Error code.
    #[serde(default)]
    pub code: i32,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// Apigee runtime instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApigeeInstanceResource {
    /// Instance name.
    pub name: String,
    /// Region.
    #[serde(default)]
    pub location: String,
    /// Internal IP of the runtime.
    pub host: Option<String>,
    /// PSC service attachment.
    pub service_attachment: Option<String>,
    /// Instance state.
    pub state: Option<String>,
}

/// Instance list response.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceListResponse {
    /// Instances.
    #[serde(default)]
    pub instances: Vec<ApigeeInstanceResource>,
}

/// Create environment request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDefinition {
    /// Environment name.
    pub name: String,
}

/// Attach environment to instance request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceAttachmentDefinition {
    /// Environment name.
    pub environment: String,
}

/// Create environment group request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentGroupDefinition {
    /// Group name.
    pub name: String,
    /// Hostnames routed to the group.
    pub hostnames: Vec<String>,
}

/// Attach environment to group request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentGroupAttachmentDefinition {
    /// Environment name.
    pub environment: String,
}

// ============================================================================
// Compute Engine types
// ============================================================================

/// Compute Engine operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperation {
    /// Operation name.
    pub name: String,
    /// Fully qualified URL of the operation.
    pub self_link: String,
    /// Status (`PENDING`, `RUNNING`, `DONE`).
    pub status: String,
    /// Errors, set when the operation failed.
    pub error: Option<ComputeOperationError>,
}

/// Errors attached to a compute operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputeOperationError {
    /// Individual errors.
    #[serde(default)]
    pub errors: Vec<ComputeErrorItem>,
}

/// A single compute operation error.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputeErrorItem {
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// Reserve address request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDefinition {
    /// Address name.
    pub name: String,
    /// IP version.
    pub ip_version: String,
    /// Address type.
    pub address_type: String,
}

/// Address resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResource {
    /// Address name.
    pub name: String,
    /// The allocated IP.
    pub address: Option<String>,
    /// Status.
    #[serde(default)]
    pub status: String,
}

/// Create SSL certificate request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCertificateDefinition {
    /// Certificate name.
    pub name: String,
    /// Certificate type.
    #[serde(rename = "type")]
    pub certificate_type: String,
    /// Managed certificate settings.
    pub managed: ManagedCertificateDefinition,
}

/// Managed certificate settings for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCertificateDefinition {
    /// Domains to issue for.
    pub domains: Vec<String>,
}

/// SSL certificate resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCertificateResource {
    /// Certificate name.
    pub name: String,
    /// Managed certificate state.
    pub managed: Option<ManagedCertificate>,
}

/// Managed certificate state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCertificate {
    /// Provisioning status.
    #[serde(default)]
    pub status: String,
    /// Domains.
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Create network endpoint group request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEndpointGroupDefinition {
    /// NEG name.
    pub name: String,
    /// Endpoint type.
    pub network_endpoint_type: String,
    /// PSC target (service attachment).
    pub psc_target_service: String,
    /// Network URL.
    pub network: String,
    /// Subnetwork URL.
    pub subnetwork: String,
}

/// Create backend service request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServiceDefinition {
    /// Backend service name.
    pub name: String,
    /// Load balancing scheme.
    pub load_balancing_scheme: String,
    /// Protocol to the backends.
    pub protocol: String,
}

/// Backend service patch that sets its backends.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServicePatch {
    /// Backends.
    pub backends: Vec<BackendDefinition>,
}

/// A backend of a backend service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDefinition {
    /// NEG URL.
    pub group: String,
}

/// Create URL map request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMapDefinition {
    /// URL map name.
    pub name: String,
    /// Default backend service URL.
    pub default_service: String,
}

/// Create target HTTPS proxy request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHttpsProxyDefinition {
    /// Proxy name.
    pub name: String,
    /// URL map URL.
    pub url_map: String,
    /// Certificate URLs.
    pub ssl_certificates: Vec<String>,
}

/// Create forwarding rule request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRuleDefinition {
    /// Rule name.
    pub name: String,
    /// IP address.
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    /// IP protocol.
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    /// Port range.
    pub port_range: String,
    /// Target proxy URL.
    pub target: String,
    /// Load balancing scheme.
    pub load_balancing_scheme: String,
    /// Network tier.
    pub network_tier: String,
}
