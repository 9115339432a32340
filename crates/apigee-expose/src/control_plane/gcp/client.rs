//! Google Cloud REST client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use super::models::{
    AddressDefinition, AddressResource, ApigeeInstanceResource, ApigeeOperation,
    BackendDefinition, BackendServiceDefinition, BackendServicePatch, ComputeOperation,
    EnvironmentDefinition, EnvironmentGroupAttachmentDefinition, EnvironmentGroupDefinition,
    ForwardingRuleDefinition, InstanceAttachmentDefinition, InstanceListResponse,
    ManagedCertificateDefinition, NetworkEndpointGroupDefinition, SslCertificateDefinition,
    SslCertificateResource, TargetHttpsProxyDefinition, UrlMapDefinition,
};
use crate::control_plane::traits::{
    Address, ApigeeInstance, CertificateStatus, ControlPlane, Operation, OperationRef,
    OperationState, PscNegRequest, SslCertificate,
};
use crate::error::ExposeError;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Apigee API base URL.
pub const APIGEE_API: &str = "https://apigee.googleapis.com/v1";

/// Compute Engine API base URL.
pub const COMPUTE_API: &str = "https://compute.googleapis.com/compute/v1";

/// Base URLs of the APIs the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    apigee: String,
    compute: String,
}

impl Endpoints {
    /// Use custom base URLs (e.g. a regional endpoint or a mock server).
    ///
    /// # Errors
    /// Returns error if either URL is not an absolute http(s) URL.
    pub fn new(apigee: &str, compute: &str) -> Result<Self, ExposeError> {
        Ok(Self {
            apigee: Self::validate(apigee)?,
            compute: Self::validate(compute)?,
        })
    }

    fn validate(base: &str) -> Result<String, ExposeError> {
        let url = Url::parse(base)
            .map_err(|e| ExposeError::Config(format!("invalid API endpoint {base}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExposeError::Config(format!(
                "API endpoint {base} must use http or https"
            )));
        }
        Ok(base.trim_end_matches('/').to_string())
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            apigee: APIGEE_API.to_string(),
            compute: COMPUTE_API.to_string(),
        }
    }
}

/// Google Cloud control plane for one project.
#[derive(Clone)]
pub struct GcpControlPlane {
    /// HTTP client.
    client: Client,
    /// Project ID (also the Apigee organization).
    project_id: String,
    /// `OAuth2` access token.
    access_token: String,
    /// API base URLs.
    endpoints: Endpoints,
}

impl GcpControlPlane {
    /// Create a new control-plane client.
    ///
    /// # Arguments
    /// * `project_id` - GCP project ID, also used as the Apigee organization
    /// * `access_token` - `OAuth2` access token
    /// * `endpoints` - API base URLs
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(
        project_id: impl Into<String>,
        access_token: impl Into<String>,
        endpoints: Endpoints,
    ) -> Result<Self, ExposeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(ExposeError::Http)?;

        Ok(Self {
            client,
            project_id: project_id.into(),
            access_token: access_token.into(),
            endpoints,
        })
    }

    fn apigee_url(&self, path: &str) -> String {
        format!(
            "{}/organizations/{}/{path}",
            self.endpoints.apigee, self.project_id
        )
    }

    fn compute_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{path}",
            self.endpoints.compute, self.project_id
        )
    }

    /// Check that an operation selfLink points below the Compute Engine base URL.
    ///
    /// The bearer token is sent along, so links to any other scheme, host,
    /// port or path prefix are refused.
    fn compute_self_link(&self, self_link: &str) -> Result<String, ExposeError> {
        let refused = || {
            ExposeError::Config(format!(
                "refusing to follow operation link outside {}: {self_link}",
                self.endpoints.compute
            ))
        };

        let base = Url::parse(&self.endpoints.compute).map_err(|_| refused())?;
        let link = Url::parse(self_link).map_err(|_| refused())?;

        let same_origin = link.scheme() == base.scheme()
            && link.host_str() == base.host_str()
            && link.port_or_known_default() == base.port_or_known_default();
        let prefix = format!("{}/", base.path().trim_end_matches('/'));

        if same_origin && link.path().starts_with(&prefix) {
            Ok(link.into())
        } else {
            warn!(self_link = %self_link, "Refusing operation link outside the compute endpoint");
            Err(refused())
        }
    }

    /// Partial URL of a global compute resource, as accepted in request bodies.
    fn global_ref(&self, collection: &str, name: &str) -> String {
        format!("projects/{}/global/{collection}/{name}", self.project_id)
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ExposeError> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T, B>(&self, url: &str, body: &B) -> Result<T, ExposeError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated PATCH request.
    async fn patch<T, B>(&self, url: &str, body: &B) -> Result<T, ExposeError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        debug!(url = %url, "PATCH request");

        let response = self
            .client
            .patch(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ExposeError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ExposeError::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(ExposeError::NotFound(text))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ExposeError::Auth(text))
        } else {
            Err(ExposeError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// POST to the Apigee API and return the started operation.
    async fn apigee_mutation<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<OperationRef, ExposeError> {
        let operation: ApigeeOperation = self.post(&self.apigee_url(path), body).await?;
        debug!(operation = %operation.name, "Apigee operation started");
        Ok(OperationRef::apigee(&operation.name))
    }

    /// POST to the Compute Engine API and return the started operation.
    async fn compute_mutation<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<OperationRef, ExposeError> {
        let operation: ComputeOperation = self.post(&self.compute_url(path), body).await?;
        debug!(operation = %operation.name, "Compute operation started");
        Ok(OperationRef::Compute {
            self_link: operation.self_link,
        })
    }

    /// Convert an Apigee operation to our type.
    fn from_apigee_operation(operation: &ApigeeOperation) -> Operation {
        let state = if operation.done {
            OperationState::Finished
        } else {
            operation
                .metadata
                .as_ref()
                .map_or(OperationState::Unknown, |m| {
                    OperationState::from_apigee(&m.state)
                })
        };

        Operation {
            reference: OperationRef::apigee(&operation.name),
            state,
            error: operation
                .error
                .as_ref()
                .map(|e| format!("{} (code {})", e.message, e.code)),
        }
    }

    /// Convert a compute operation to our type.
    fn from_compute_operation(operation: &ComputeOperation) -> Operation {
        let error = operation
            .error
            .as_ref()
            .filter(|e| !e.errors.is_empty())
            .map(|e| {
                e.errors
                    .iter()
                    .map(|item| format!("{}: {}", item.code, item.message))
                    .collect::<Vec<_>>()
                    .join("; ")
            });

        Operation {
            reference: OperationRef::Compute {
                self_link: operation.self_link.clone(),
            },
            state: OperationState::from_compute(&operation.status),
            error,
        }
    }

    /// Convert an Apigee instance to our type.
    fn to_instance(instance: &ApigeeInstanceResource) -> ApigeeInstance {
        ApigeeInstance {
            name: instance.name.clone(),
            location: instance.location.clone(),
            host: instance.host.clone(),
            service_attachment: instance.service_attachment.clone(),
        }
    }

    /// Convert an SSL certificate to our type.
    fn to_certificate(certificate: &SslCertificateResource) -> SslCertificate {
        let (status, domains) = certificate.managed.as_ref().map_or_else(
            || (CertificateStatus::Unknown, Vec::new()),
            |managed| {
                let status = serde_json::from_value(serde_json::Value::String(
                    managed.status.clone(),
                ))
                .unwrap_or(CertificateStatus::Unknown);
                (status, managed.domains.clone())
            },
        );

        SslCertificate {
            name: certificate.name.clone(),
            status,
            domains,
        }
    }
}

#[async_trait]
impl ControlPlane for GcpControlPlane {
    async fn get_operation(&self, operation: &OperationRef) -> Result<Operation, ExposeError> {
        match operation {
            OperationRef::Apigee { id } => {
                let url = self.apigee_url(&format!("operations/{id}"));
                let op: ApigeeOperation = self.get(&url).await?;
                Ok(Self::from_apigee_operation(&op))
            }
            OperationRef::Compute { self_link } => {
                let url = self.compute_self_link(self_link)?;
                let op: ComputeOperation = self.get(&url).await?;
                Ok(Self::from_compute_operation(&op))
            }
        }
    }

    // ========================================================================
    // Apigee
    // ========================================================================

    async fn list_instances(&self) -> Result<Vec<ApigeeInstance>, ExposeError> {
        let response: InstanceListResponse = self.get(&self.apigee_url("instances")).await?;
        Ok(response.instances.iter().map(Self::to_instance).collect())
    }

    async fn get_instance(&self, name: &str) -> Result<ApigeeInstance, ExposeError> {
        let instance: ApigeeInstanceResource =
            self.get(&self.apigee_url(&format!("instances/{name}"))).await?;
        Ok(Self::to_instance(&instance))
    }

    async fn create_environment(&self, name: &str) -> Result<OperationRef, ExposeError> {
        info!(environment = %name, "Creating Apigee environment");

        let body = EnvironmentDefinition {
            name: name.to_string(),
        };
        self.apigee_mutation("environments", &body).await
    }

    async fn attach_environment_to_instance(
        &self,
        instance: &str,
        environment: &str,
    ) -> Result<OperationRef, ExposeError> {
        info!(instance = %instance, environment = %environment, "Attaching environment to instance");

        let body = InstanceAttachmentDefinition {
            environment: environment.to_string(),
        };
        self.apigee_mutation(&format!("instances/{instance}/attachments"), &body)
            .await
    }

    async fn create_environment_group(
        &self,
        name: &str,
        hostnames: &[String],
    ) -> Result<OperationRef, ExposeError> {
        info!(group = %name, hostnames = ?hostnames, "Creating environment group");

        let body = EnvironmentGroupDefinition {
            name: name.to_string(),
            hostnames: hostnames.to_vec(),
        };
        self.apigee_mutation(&format!("envgroups?name={name}"), &body)
            .await
    }

    async fn attach_environment_to_group(
        &self,
        group: &str,
        environment: &str,
    ) -> Result<OperationRef, ExposeError> {
        info!(group = %group, environment = %environment, "Attaching environment to group");

        let body = EnvironmentGroupAttachmentDefinition {
            environment: environment.to_string(),
        };
        self.apigee_mutation(&format!("envgroups/{group}/attachments"), &body)
            .await
    }

    // ========================================================================
    // Compute Engine
    // ========================================================================

    async fn reserve_global_address(&self, name: &str) -> Result<OperationRef, ExposeError> {
        info!(address = %name, "Reserving global address");

        let body = AddressDefinition {
            name: name.to_string(),
            ip_version: "IPV4".to_string(),
            address_type: "EXTERNAL".to_string(),
        };
        self.compute_mutation("global/addresses", &body).await
    }

    async fn get_global_address(&self, name: &str) -> Result<Address, ExposeError> {
        let address: AddressResource = self
            .get(&self.compute_url(&format!("global/addresses/{name}")))
            .await?;

        Ok(Address {
            name: address.name,
            address: address.address,
            status: address.status,
        })
    }

    async fn create_managed_certificate(
        &self,
        name: &str,
        domains: &[String],
    ) -> Result<OperationRef, ExposeError> {
        info!(certificate = %name, domains = ?domains, "Creating managed SSL certificate");

        let body = SslCertificateDefinition {
            name: name.to_string(),
            certificate_type: "MANAGED".to_string(),
            managed: ManagedCertificateDefinition {
                domains: domains.to_vec(),
            },
        };
        self.compute_mutation("global/sslCertificates", &body).await
    }

    async fn get_ssl_certificate(&self, name: &str) -> Result<SslCertificate, ExposeError> {
        let certificate: SslCertificateResource = self
            .get(&self.compute_url(&format!("global/sslCertificates/{name}")))
            .await?;
        Ok(Self::to_certificate(&certificate))
    }

    async fn create_psc_neg(&self, req: &PscNegRequest) -> Result<OperationRef, ExposeError> {
        info!(
            neg = %req.name,
            region = %req.region,
            target = %req.target_service,
            "Creating PSC network endpoint group"
        );

        let body = NetworkEndpointGroupDefinition {
            name: req.name.clone(),
            network_endpoint_type: "PRIVATE_SERVICE_CONNECT".to_string(),
            psc_target_service: req.target_service.clone(),
            network: self.global_ref("networks", &req.network),
            subnetwork: format!(
                "projects/{}/regions/{}/subnetworks/{}",
                self.project_id, req.region, req.subnet
            ),
        };
        self.compute_mutation(
            &format!("regions/{}/networkEndpointGroups", req.region),
            &body,
        )
        .await
    }

    async fn create_backend_service(&self, name: &str) -> Result<OperationRef, ExposeError> {
        info!(backend_service = %name, "Creating backend service");

        let body = BackendServiceDefinition {
            name: name.to_string(),
            load_balancing_scheme: "EXTERNAL_MANAGED".to_string(),
            protocol: "HTTPS".to_string(),
        };
        self.compute_mutation("global/backendServices", &body).await
    }

    async fn add_backend(
        &self,
        backend_service: &str,
        neg: &str,
        region: &str,
    ) -> Result<OperationRef, ExposeError> {
        info!(backend_service = %backend_service, neg = %neg, "Adding backend");

        let body = BackendServicePatch {
            backends: vec![BackendDefinition {
                group: format!(
                    "projects/{}/regions/{region}/networkEndpointGroups/{neg}",
                    self.project_id
                ),
            }],
        };
        let url = self.compute_url(&format!("global/backendServices/{backend_service}"));
        let operation: ComputeOperation = self.patch(&url, &body).await?;
        Ok(OperationRef::Compute {
            self_link: operation.self_link,
        })
    }

    async fn create_url_map(
        &self,
        name: &str,
        default_service: &str,
    ) -> Result<OperationRef, ExposeError> {
        info!(url_map = %name, "Creating URL map");

        let body = UrlMapDefinition {
            name: name.to_string(),
            default_service: self.global_ref("backendServices", default_service),
        };
        self.compute_mutation("global/urlMaps", &body).await
    }

    async fn create_https_proxy(
        &self,
        name: &str,
        url_map: &str,
        certificate: &str,
    ) -> Result<OperationRef, ExposeError> {
        info!(proxy = %name, "Creating target HTTPS proxy");

        let body = TargetHttpsProxyDefinition {
            name: name.to_string(),
            url_map: self.global_ref("urlMaps", url_map),
            ssl_certificates: vec![self.global_ref("sslCertificates", certificate)],
        };
        self.compute_mutation("global/targetHttpsProxies", &body)
            .await
    }

    async fn create_forwarding_rule(
        &self,
        name: &str,
        address: &str,
        proxy: &str,
    ) -> Result<OperationRef, ExposeError> {
        info!(rule = %name, address = %address, "Creating forwarding rule");

        let body = ForwardingRuleDefinition {
            name: name.to_string(),
            ip_address: address.to_string(),
            ip_protocol: "TCP".to_string(),
            port_range: "443".to_string(),
            target: self.global_ref("targetHttpsProxies", proxy),
            load_balancing_scheme: "EXTERNAL_MANAGED".to_string(),
            network_tier: "PREMIUM".to_string(),
        };
        self.compute_mutation("global/forwardingRules", &body).await
    }
}
