//! CLI subcommands.

pub mod check;
pub mod provision;
pub mod wait;

use std::sync::Arc;

use apigee_expose::control_plane::gcp::{APIGEE_API, COMPUTE_API};
use apigee_expose::validator::RequiredTool;
use apigee_expose::{auth, ControlPlane, Endpoints, ExposeError, GcpControlPlane};
use clap::Args;

/// How to reach the Google Cloud APIs.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// GCP project ID, also the Apigee organization.
    #[arg(long, env = "PROJECT", value_name = "PROJECT_ID")]
    pub project: Option<String>,

    /// OAuth access token. Minted with gcloud when unset.
    #[arg(long, env = "GCP_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Apigee API base URL.
    #[arg(long, value_name = "URL", default_value = APIGEE_API)]
    pub apigee_endpoint: String,

    /// Compute Engine API base URL.
    #[arg(long, value_name = "URL", default_value = COMPUTE_API)]
    pub compute_endpoint: String,
}

impl ConnectionArgs {
    /// Project ID, empty when unset.
    pub fn project(&self) -> &str {
        self.project.as_deref().unwrap_or_default()
    }

    /// gcloud is needed only when no token was given.
    pub fn required_tools(&self) -> Vec<RequiredTool> {
        let has_token = self
            .access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if has_token {
            Vec::new()
        } else {
            vec![RequiredTool::gcloud()]
        }
    }

    /// Resolve credentials and build the control-plane client.
    ///
    /// # Errors
    ///
    /// Returns an error if no token can be obtained or an endpoint is invalid.
    pub async fn connect(&self) -> Result<Arc<dyn ControlPlane>, ExposeError> {
        let project = self.project();
        if project.trim().is_empty() {
            return Err(ExposeError::Config(
                "PROJECT is not set; pass --project or export PROJECT".to_string(),
            ));
        }

        let endpoints = Endpoints::new(&self.apigee_endpoint, &self.compute_endpoint)?;
        let token = auth::resolve_access_token(self.access_token.as_deref()).await?;
        let control_plane = GcpControlPlane::new(project, token, endpoints)?;
        Ok(Arc::new(control_plane))
    }
}
