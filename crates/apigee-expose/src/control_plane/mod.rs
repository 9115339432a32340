//! Control-plane abstractions.
//!
//! This module defines the [`ControlPlane`] trait the waiters and the
//! provisioning pipeline talk to, and its Google Cloud implementation.

pub mod gcp;
mod traits;

#[cfg(test)]
pub(crate) mod fake;

pub use traits::{
    Address, ApigeeInstance, CertificateStatus, ControlPlane, Operation, OperationRef,
    OperationState, PscNegRequest, SslCertificate,
};

pub use gcp::{Endpoints, GcpControlPlane};
