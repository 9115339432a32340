//! Google Cloud control plane.
//!
//! Implements the [`ControlPlane`](super::ControlPlane) trait over two REST
//! APIs:
//!
//! - **Apigee** (`apigee.googleapis.com/v1`) - environments, environment
//!   groups, instance attachments and their operations
//! - **Compute Engine** (`compute.googleapis.com/compute/v1`) - addresses,
//!   certificates, network endpoint groups and the load balancer chain
//!
//! The Apigee organization name is the project ID.

mod client;
mod models;

pub use client::{Endpoints, GcpControlPlane, APIGEE_API, COMPUTE_API};
pub use models::*;
