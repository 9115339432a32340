//! apigee-expose CLI.
//!
//! Puts an Apigee runtime instance behind a Google Cloud global external
//! HTTPS load balancer and waits for every step to converge.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::check::CheckCommand;
use commands::provision::ProvisionCommand;
use commands::wait::{WaitCertificateCommand, WaitOperationCommand};

/// Expose an Apigee runtime through an external HTTPS load balancer.
#[derive(Parser)]
#[command(
    name = "apigee-expose",
    version,
    about = "Expose an Apigee runtime through an external HTTPS load balancer",
    long_about = "Provision the Google Cloud resources that put an Apigee runtime\n\
                  instance behind a global external HTTPS load balancer.\n\n\
                  Every long-running operation is awaited before the next step\n\
                  starts. The run stops at the first failure and leaves already\n\
                  created resources in place."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Provision the environment, certificate and load balancer.
    Provision(ProvisionCommand),

    /// Wait for a long-running operation to finish.
    WaitOperation(WaitOperationCommand),

    /// Wait for a managed SSL certificate to become active.
    WaitCertificate(WaitCertificateCommand),

    /// Check prerequisites without touching the control plane.
    Check(CheckCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("info,apigee_expose=debug")
    } else {
        EnvFilter::new("warn,apigee_expose=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Provision(cmd) => cmd.run().await,
        Commands::WaitOperation(cmd) => cmd.run().await,
        Commands::WaitCertificate(cmd) => cmd.run().await,
        Commands::Check(cmd) => cmd.run(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("apigee-expose").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_zero_operation_timeout_rejected() {
        assert!(parse(&["provision", "--operation-timeout", "0"]).is_err());
        assert!(parse(&["wait-operation", "op-1", "--timeout", "0"]).is_err());
        assert!(parse(&["provision", "--operation-timeout", "1"]).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(parse(&["provision", "--poll-interval", "0"]).is_err());
        assert!(parse(&["provision", "--certificate-interval", "0"]).is_err());
        assert!(parse(&["wait-operation", "op-1", "--interval", "0"]).is_err());
        assert!(parse(&["wait-certificate", "lb-cert", "--interval", "0"]).is_err());
    }

    #[test]
    fn test_zero_certificate_timeout_allowed() {
        assert!(parse(&["provision", "--certificate-timeout", "0"]).is_ok());
        assert!(parse(&["wait-certificate", "lb-cert", "--timeout", "0"]).is_ok());
    }
}
