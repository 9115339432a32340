//! Access token for the Google Cloud APIs.
//!
//! The token is resolved once at startup and handed to the control-plane
//! client; nothing reads it from the environment afterwards.

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ExposeError;

/// Resolve the bearer token.
///
/// An explicit, non-blank token wins. Otherwise the token is minted with
/// `gcloud auth print-access-token`.
///
/// # Errors
/// Returns error if `gcloud` cannot be run, exits unsuccessfully, or prints
/// an empty token.
pub async fn resolve_access_token(explicit: Option<&str>) -> Result<String, ExposeError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Using access token from command line or environment");
        return Ok(token.to_string());
    }

    info!("Fetching access token from gcloud");
    gcloud_access_token().await
}

async fn gcloud_access_token() -> Result<String, ExposeError> {
    const COMMAND: &str = "gcloud auth print-access-token";

    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| ExposeError::Command {
            command: COMMAND.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ExposeError::Command {
            command: COMMAND.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ExposeError::Auth(
            "gcloud returned an empty access token; run `gcloud auth login`".to_string(),
        ));
    }
    Ok(token)
}
