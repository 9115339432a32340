//! Apigee external load balancer provisioning.
//!
//! Exposes an Apigee runtime instance through a Google Cloud global external
//! HTTPS load balancer: environment and environment group, reserved IP,
//! managed certificate, PSC network endpoint group, backend service, URL map,
//! HTTPS proxy and forwarding rule. Every asynchronous control-plane change
//! is awaited before the next step starts.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use apigee_expose::{ControlPlane, Endpoints, ExposeConfig, GcpControlPlane, Provisioner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExposeConfig::with_defaults("my-proj", "default", "psc-subnet");
//!     let report = Provisioner::new(config)
//!         .run(|| async {
//!             let token = apigee_expose::auth::resolve_access_token(None).await?;
//!             let cp = GcpControlPlane::new("my-proj", token, Endpoints::default())?;
//!             Ok(Arc::new(cp) as Arc<dyn ControlPlane>)
//!         })
//!         .await?;
//!     println!("{}", report.verification_command("")?);
//!     Ok(())
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod pipeline;
pub mod testsuite;
pub mod ui;
pub mod validator;
pub mod waiter;

// Re-export commonly used types at the crate root
pub use config::ExposeConfig;
pub use control_plane::{ControlPlane, Endpoints, GcpControlPlane, OperationRef};
pub use error::ExposeError;
pub use pipeline::{ProvisionReport, ProvisionStep, Provisioner};
pub use testsuite::TestSuite;
pub use waiter::{wait_for_certificate, wait_for_operation, WaitPolicy};
