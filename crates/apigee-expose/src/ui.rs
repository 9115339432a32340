//! UI helpers for the CLI.
//!
//! Provides consistent formatting for console output during provisioning.

use std::time::Duration;

use colored::Colorize;

use crate::pipeline::ProvisionReport;

/// Print the tool banner.
pub fn print_banner() {
    println!();
    println!("{}", "  apigee-expose".cyan().bold());
    println!(
        "  {}",
        "Apigee runtime behind an external HTTPS load balancer".bright_black()
    );
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!();
}

/// Print a progress step with step number.
pub fn print_progress_step(current: u8, total: u8, message: &str) {
    println!(
        "{} {} {}",
        format!("[{current}/{total}]").bright_black(),
        "▶".cyan(),
        message.bold()
    );
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print prerequisite check result.
pub fn print_check_result(name: &str, passed: bool, message: Option<&str>) {
    let status = if passed { "✓".green() } else { "✗".red() };

    let text = if let Some(msg) = message {
        format!("{name} - {msg}")
    } else {
        name.to_string()
    };

    println!("  {status} {text}");
}

/// Print one polling attempt.
pub fn print_poll_progress(target: &str, attempt: u32, state: &str, elapsed: Duration) {
    println!(
        "  {} {} {} {}",
        "⟳".cyan(),
        target,
        format!("[{state}]").yellow(),
        format!("attempt {attempt}, {}s elapsed", elapsed.as_secs()).bright_black()
    );
}

/// Print the provisioned resources.
pub fn print_report_summary(report: &ProvisionReport) {
    print_section("Provisioned Resources");

    let rows = [
        ("Project", Some(report.project.as_str())),
        ("Environment", Some(report.environment.as_str())),
        ("Environment group", Some(report.environment_group.as_str())),
        ("Instance", report.instance.as_deref()),
        ("IP address", report.ip_address.as_deref()),
        ("Hostname", report.hostname.as_deref()),
        ("Certificate", Some(report.certificate.as_str())),
        ("Network endpoint group", Some(report.network_endpoint_group.as_str())),
        ("Backend service", Some(report.backend_service.as_str())),
        ("URL map", Some(report.url_map.as_str())),
        ("HTTPS proxy", Some(report.https_proxy.as_str())),
        ("Forwarding rule", Some(report.forwarding_rule.as_str())),
    ];

    if let Some(step) = report.failed_step {
        println!("  {:<24} {}", "Failed at".bright_black(), step.to_string().red());
    }

    for (label, value) in rows {
        println!(
            "  {:<24} {}",
            label.bright_black(),
            value.unwrap_or("-")
        );
    }
    println!();
}

/// Print how to call the exposed runtime.
pub fn print_verification_instructions(command: &str) {
    println!("{}", "To verify the deployment, send a request:".bold());
    println!();
    println!("  {}", command.cyan());
    println!();
}
