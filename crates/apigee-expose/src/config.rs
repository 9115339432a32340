//! Provisioning configuration.
//!
//! This module defines what gets provisioned and how resources are named.

use serde::{Deserialize, Serialize};

/// Default Apigee environment name.
pub const DEFAULT_ENVIRONMENT: &str = "eval";

/// Default environment group name.
pub const DEFAULT_ENVIRONMENT_GROUP: &str = "eval-group";

/// Default prefix for load balancer resource names.
pub const DEFAULT_PREFIX: &str = "apigee-xlb";

/// Default JSON query tool required on `PATH`.
pub const DEFAULT_JSON_QUERY_TOOL: &str = "jq";

/// Full provisioning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposeConfig {
    // Required
    /// GCP project ID, also the Apigee organization (`PROJECT`).
    pub project: String,
    /// VPC network the Apigee instance is peered with (`NETWORK`).
    pub network: String,
    /// Subnetwork for the PSC network endpoint group (`SUBNET`).
    pub subnet: String,

    // Apigee
    /// Runtime instance. The organization's first instance when unset.
    pub instance: Option<String>,
    /// Region for regional resources. The instance's location when unset.
    pub region: Option<String>,
    /// Environment to create.
    pub environment: String,
    /// Environment group to create.
    pub environment_group: String,

    // Load balancer
    /// Prefix for load balancer resource names.
    pub prefix: String,
    /// Hostname to serve. Derived from the reserved IP when unset.
    pub hostname: Option<String>,
    /// Path used in the verification request.
    pub base_path: String,

    // Tooling
    /// JSON query tool that must be installed.
    pub json_query_tool: String,
}

impl ExposeConfig {
    /// Create config with defaults for everything but the required values.
    #[must_use]
    pub fn with_defaults(
        project: impl Into<String>,
        network: impl Into<String>,
        subnet: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            network: network.into(),
            subnet: subnet.into(),
            instance: None,
            region: None,
            environment: DEFAULT_ENVIRONMENT.into(),
            environment_group: DEFAULT_ENVIRONMENT_GROUP.into(),
            prefix: DEFAULT_PREFIX.into(),
            hostname: None,
            base_path: String::new(),
            json_query_tool: DEFAULT_JSON_QUERY_TOOL.into(),
        }
    }

    /// Required settings, keyed by their environment variable.
    #[must_use]
    pub fn required_variables(&self) -> [(&'static str, &str); 3] {
        [
            ("PROJECT", self.project.as_str()),
            ("NETWORK", self.network.as_str()),
            ("SUBNET", self.subnet.as_str()),
        ]
    }

    /// Name of the reserved global address.
    #[must_use]
    pub fn address_name(&self) -> String {
        format!("{}-ip", self.prefix)
    }

    /// Name of the managed certificate.
    #[must_use]
    pub fn certificate_name(&self) -> String {
        format!("{}-cert", self.prefix)
    }

    /// Name of the PSC network endpoint group.
    #[must_use]
    pub fn neg_name(&self) -> String {
        format!("{}-neg", self.prefix)
    }

    /// Name of the backend service.
    #[must_use]
    pub fn backend_service_name(&self) -> String {
        format!("{}-backend", self.prefix)
    }

    /// Name of the URL map.
    #[must_use]
    pub fn url_map_name(&self) -> String {
        format!("{}-url-map", self.prefix)
    }

    /// Name of the target HTTPS proxy.
    #[must_use]
    pub fn https_proxy_name(&self) -> String {
        format!("{}-https-proxy", self.prefix)
    }

    /// Name of the forwarding rule.
    #[must_use]
    pub fn forwarding_rule_name(&self) -> String {
        format!("{}-fwd-rule", self.prefix)
    }

    /// Hostname the runtime is served on.
    ///
    /// Without an explicit hostname, the IP is mapped to a wildcard DNS name,
    /// e.g. `34.1.2.3` becomes `34-1-2-3.nip.io`.
    #[must_use]
    pub fn runtime_hostname(&self, ip: &str) -> String {
        match &self.hostname {
            Some(hostname) => hostname.clone(),
            None => format!("{}.nip.io", ip.replace('.', "-")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ExposeConfig::with_defaults("my-proj", "default", "psc-subnet");
        assert_eq!(config.project, "my-proj");
        assert_eq!(config.environment, "eval");
        assert_eq!(config.environment_group, "eval-group");
        assert_eq!(config.json_query_tool, "jq");
        assert!(config.instance.is_none());
        assert!(config.region.is_none());
    }

    #[test]
    fn test_resource_names() {
        let mut config = ExposeConfig::with_defaults("p", "n", "s");
        config.prefix = "edge".into();
        assert_eq!(config.address_name(), "edge-ip");
        assert_eq!(config.certificate_name(), "edge-cert");
        assert_eq!(config.neg_name(), "edge-neg");
        assert_eq!(config.backend_service_name(), "edge-backend");
        assert_eq!(config.url_map_name(), "edge-url-map");
        assert_eq!(config.https_proxy_name(), "edge-https-proxy");
        assert_eq!(config.forwarding_rule_name(), "edge-fwd-rule");
    }

    #[test]
    fn test_runtime_hostname() {
        let mut config = ExposeConfig::with_defaults("p", "n", "s");
        assert_eq!(config.runtime_hostname("34.1.2.3"), "34-1-2-3.nip.io");

        config.hostname = Some("api.example.com".into());
        assert_eq!(config.runtime_hostname("34.1.2.3"), "api.example.com");
    }

    #[test]
    fn test_required_variables() {
        let config = ExposeConfig::with_defaults("p", "", "s");
        let missing: Vec<_> = config
            .required_variables()
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(missing, vec!["NETWORK"]);
    }
}
