//! Wait commands - block on a single operation or certificate.

use anyhow::Result;
use apigee_expose::waiter::{
    CERTIFICATE_POLL_INTERVAL_SECS, CERTIFICATE_TIMEOUT_SECS, MAX_QUERY_FAILURES,
    OPERATION_POLL_INTERVAL_SECS, OPERATION_TIMEOUT_SECS,
};
use apigee_expose::{ui, wait_for_certificate, wait_for_operation, OperationRef, WaitPolicy};
use clap::Args;

use super::ConnectionArgs;

/// Wait for a long-running operation to finish.
#[derive(Args, Debug, Clone)]
pub struct WaitOperationCommand {
    /// Apigee operation name or Compute Engine operation selfLink.
    #[arg(value_name = "OPERATION")]
    pub operation: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Seconds between polls.
    #[arg(
        long,
        default_value_t = OPERATION_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Seconds to wait.
    #[arg(
        long,
        default_value_t = OPERATION_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Consecutive failed status queries tolerated.
    #[arg(long, default_value_t = MAX_QUERY_FAILURES)]
    pub max_query_failures: u32,
}

impl WaitOperationCommand {
    /// Run the wait-operation command.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails, times out or cannot be queried.
    pub async fn run(&self) -> Result<()> {
        let operation: OperationRef = self.operation.parse()?;
        let policy =
            WaitPolicy::bounded_from_secs(self.interval, self.timeout, self.max_query_failures)?;
        let control_plane = self.connection.connect().await?;

        wait_for_operation(control_plane.as_ref(), &operation, &policy).await?;
        ui::print_success(&format!("Operation {} finished", operation.id()));
        Ok(())
    }
}

/// Wait for a managed SSL certificate to become active.
#[derive(Args, Debug, Clone)]
pub struct WaitCertificateCommand {
    /// Certificate name.
    #[arg(value_name = "CERTIFICATE")]
    pub certificate: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Seconds between polls.
    #[arg(
        long,
        default_value_t = CERTIFICATE_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Seconds to wait (0 waits indefinitely).
    #[arg(long, default_value_t = CERTIFICATE_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Consecutive failed status queries tolerated.
    #[arg(long, default_value_t = MAX_QUERY_FAILURES)]
    pub max_query_failures: u32,
}

impl WaitCertificateCommand {
    /// Run the wait-certificate command.
    ///
    /// # Errors
    ///
    /// Returns an error if provisioning fails, times out or cannot be queried.
    pub async fn run(&self) -> Result<()> {
        let policy = WaitPolicy::from_secs(self.interval, self.timeout, self.max_query_failures)?;
        let control_plane = self.connection.connect().await?;

        wait_for_certificate(control_plane.as_ref(), &self.certificate, &policy).await?;
        ui::print_success(&format!("Certificate {} is active", self.certificate));
        Ok(())
    }
}
