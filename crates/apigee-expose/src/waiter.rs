//! Waiting for long-running operations and managed certificates.
//!
//! Both waiters share one polling loop: query the control plane, return as
//! soon as the resource is terminal, otherwise sleep for a fixed interval and
//! try again until the deadline passes. The deadline is measured on the tokio
//! clock from the first poll.
//!
//! A status query that fails transiently is not the same as "still running":
//! up to [`WaitPolicy::max_query_failures`] consecutive failures are retried,
//! the next one is returned as [`ExposeError::StatusQuery`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::control_plane::{CertificateStatus, ControlPlane, Operation, OperationRef, SslCertificate};
use crate::error::ExposeError;
use crate::ui;

/// Polling interval for operations.
pub const OPERATION_POLL_INTERVAL_SECS: u64 = 5;

/// Deadline for operations.
pub const OPERATION_TIMEOUT_SECS: u64 = 600;

/// Polling interval for certificate provisioning.
pub const CERTIFICATE_POLL_INTERVAL_SECS: u64 = 15;

/// Deadline for certificate provisioning.
pub const CERTIFICATE_TIMEOUT_SECS: u64 = 3600;

/// Consecutive failed status queries tolerated before giving up.
pub const MAX_QUERY_FAILURES: u32 = 3;

/// How to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between polls.
    pub interval: Duration,
    /// Total time budget. `None` polls until the resource converges.
    pub timeout: Option<Duration>,
    /// Consecutive failed status queries tolerated before giving up.
    pub max_query_failures: u32,
    /// Print a progress line per poll.
    pub show_progress: bool,
}

impl WaitPolicy {
    /// Policy for long-running operations.
    #[must_use]
    pub fn operations() -> Self {
        Self {
            interval: Duration::from_secs(OPERATION_POLL_INTERVAL_SECS),
            timeout: Some(Duration::from_secs(OPERATION_TIMEOUT_SECS)),
            max_query_failures: MAX_QUERY_FAILURES,
            show_progress: true,
        }
    }

    /// Policy for managed certificate provisioning.
    #[must_use]
    pub fn certificates() -> Self {
        Self {
            interval: Duration::from_secs(CERTIFICATE_POLL_INTERVAL_SECS),
            timeout: Some(Duration::from_secs(CERTIFICATE_TIMEOUT_SECS)),
            max_query_failures: MAX_QUERY_FAILURES,
            show_progress: true,
        }
    }

    /// Build a policy from seconds; a timeout of zero means no deadline.
    ///
    /// # Errors
    /// Returns [`ExposeError::Config`] if the interval is zero.
    pub fn from_secs(
        interval_secs: u64,
        timeout_secs: u64,
        max_query_failures: u32,
    ) -> Result<Self, ExposeError> {
        if interval_secs == 0 {
            return Err(ExposeError::Config(
                "poll interval must be at least 1 second".to_string(),
            ));
        }
        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_query_failures,
            show_progress: true,
        })
    }

    /// Build an operation policy from seconds. The deadline is mandatory.
    ///
    /// # Errors
    /// Returns [`ExposeError::Config`] if the interval or the timeout is zero.
    pub fn bounded_from_secs(
        interval_secs: u64,
        timeout_secs: u64,
        max_query_failures: u32,
    ) -> Result<Self, ExposeError> {
        if timeout_secs == 0 {
            return Err(ExposeError::Config(
                "operation timeout must be at least 1 second".to_string(),
            ));
        }
        Self::from_secs(interval_secs, timeout_secs, max_query_failures)
    }

    /// Disable per-poll console output.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::operations()
    }
}

/// Outcome of a single poll.
enum Probe<T> {
    /// Terminal and successful.
    Ready(T),
    /// Not yet terminal; carries the reported state.
    Pending(String),
    /// Terminal and failed; never retried.
    Failed(ExposeError),
}

/// Block until `operation` reaches its terminal state.
///
/// # Errors
/// Returns [`ExposeError::Config`] when `policy` has no deadline,
/// [`ExposeError::Timeout`] when the deadline passes,
/// [`ExposeError::OperationFailed`] when the operation finished with an
/// error, [`ExposeError::StatusQuery`] when status lookups keep failing, or
/// the lookup error itself when it is not transient.
pub async fn wait_for_operation<C>(
    control_plane: &C,
    operation: &OperationRef,
    policy: &WaitPolicy,
) -> Result<Operation, ExposeError>
where
    C: ControlPlane + ?Sized,
{
    if policy.timeout.is_none() {
        return Err(ExposeError::Config(
            "operation waits require a timeout".to_string(),
        ));
    }

    let target = operation.to_string();
    info!(operation = %operation.id(), "Waiting for operation");

    poll_until(&target, policy, move || async move {
        let observed = control_plane.get_operation(operation).await?;
        if !observed.is_finished() {
            return Ok(Probe::Pending(observed.state.to_string()));
        }
        match observed.error {
            Some(message) => Ok(Probe::Failed(ExposeError::OperationFailed {
                name: operation.id().to_string(),
                message,
            })),
            None => Ok(Probe::Ready(observed)),
        }
    })
    .await
}

/// Block until the managed certificate `name` is `ACTIVE`.
///
/// # Errors
/// Returns [`ExposeError::Timeout`] when the deadline passes,
/// [`ExposeError::CertificateFailed`] when provisioning failed permanently,
/// or a status lookup error as for [`wait_for_operation`].
pub async fn wait_for_certificate<C>(
    control_plane: &C,
    name: &str,
    policy: &WaitPolicy,
) -> Result<SslCertificate, ExposeError>
where
    C: ControlPlane + ?Sized,
{
    let target = format!("certificate {name}");
    info!(certificate = %name, "Waiting for certificate to become active");

    poll_until(&target, policy, move || async move {
        let certificate = control_plane.get_ssl_certificate(name).await?;
        Ok(match certificate.status {
            CertificateStatus::Active => Probe::Ready(certificate),
            CertificateStatus::ProvisioningFailedPermanently => {
                Probe::Failed(ExposeError::CertificateFailed {
                    name: name.to_string(),
                    status: certificate.status.to_string(),
                })
            }
            status => Probe::Pending(status.to_string()),
        })
    })
    .await
}

async fn poll_until<T, F, Fut>(
    target: &str,
    policy: &WaitPolicy,
    mut probe: F,
) -> Result<T, ExposeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, ExposeError>>,
{
    if policy.interval.is_zero() {
        return Err(ExposeError::Config(
            "poll interval must be at least 1 second".to_string(),
        ));
    }

    let start = Instant::now();
    let mut attempt: u32 = 0;
    let mut query_failures: u32 = 0;

    loop {
        attempt += 1;

        let state = match probe().await {
            Ok(Probe::Ready(value)) => {
                info!(
                    resource = %target,
                    attempts = attempt,
                    elapsed_secs = start.elapsed().as_secs(),
                    "Wait complete"
                );
                return Ok(value);
            }
            Ok(Probe::Pending(state)) => {
                query_failures = 0;
                state
            }
            Ok(Probe::Failed(err)) => return Err(err),
            Err(err) if err.is_transient() && query_failures < policy.max_query_failures => {
                query_failures += 1;
                warn!(
                    resource = %target,
                    attempt,
                    failures = query_failures,
                    error = %err,
                    "Status query failed, will retry"
                );
                "query failed".to_string()
            }
            Err(err) if err.is_transient() => {
                return Err(ExposeError::StatusQuery {
                    target: target.to_string(),
                    attempts: query_failures + 1,
                    source: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        };

        let elapsed = start.elapsed();
        debug!(
            resource = %target,
            state = %state,
            attempt,
            elapsed_secs = elapsed.as_secs(),
            "Polling status"
        );
        if policy.show_progress {
            ui::print_poll_progress(target, attempt, &state, elapsed);
        }

        if let Some(timeout) = policy.timeout {
            if elapsed >= timeout {
                return Err(ExposeError::Timeout {
                    target: target.to_string(),
                    secs: timeout.as_secs(),
                });
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::fake::FakeControlPlane;
    use crate::control_plane::OperationState;

    fn op() -> OperationRef {
        OperationRef::apigee("organizations/my-proj/operations/op-1")
    }

    fn policy(interval_secs: u64, timeout_secs: u64) -> WaitPolicy {
        WaitPolicy::from_secs(interval_secs, timeout_secs, MAX_QUERY_FAILURES)
            .unwrap()
            .quiet()
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_on_first_poll_does_not_sleep() {
        let cp = FakeControlPlane::new();
        let start = Instant::now();

        let result = wait_for_operation(&cp, &op(), &policy(5, 600)).await.unwrap();

        assert!(result.is_finished());
        assert_eq!(cp.count("get_operation"), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_running_finished() {
        // Unrecognised states such as RUNNING are treated as not yet finished.
        let cp = FakeControlPlane::new().with_operation_states(&[
            OperationState::from_apigee("RUNNING"),
            OperationState::from_apigee("RUNNING"),
            OperationState::from_apigee("FINISHED"),
        ]);
        let start = Instant::now();

        wait_for_operation(&cp, &op(), &policy(5, 600)).await.unwrap();

        assert_eq!(cp.count("get_operation"), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_pending_then_finished_polls_n_plus_one() {
        let pending = vec![OperationState::InProgress; 7];
        let cp = FakeControlPlane::new().with_operation_states(&pending);

        wait_for_operation(&cp, &op(), &policy(5, 600)).await.unwrap();

        assert_eq!(cp.count("get_operation"), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_stops_polling() {
        let pending = vec![OperationState::InProgress; 100];
        let cp = FakeControlPlane::new().with_operation_states(&pending);

        let err = wait_for_operation(&cp, &op(), &policy(5, 20))
            .await
            .unwrap_err();

        match err {
            ExposeError::Timeout { target, secs } => {
                assert_eq!(secs, 20);
                assert!(target.contains("op-1"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        // Polls at 0, 5, 10, 15 and 20 seconds.
        assert_eq!(cp.count("get_operation"), 5);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cp.count("get_operation"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_with_error_fails() {
        let cp = FakeControlPlane::new()
            .with_operation_states(&[OperationState::InProgress])
            .with_operation_error("ALREADY_EXISTS");

        let err = wait_for_operation(&cp, &op(), &policy(5, 600))
            .await
            .unwrap_err();

        assert!(matches!(err, ExposeError::OperationFailed { ref message, .. } if message == "ALREADY_EXISTS"));
        assert_eq!(cp.count("get_operation"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_query_failures_are_retried() {
        let cp = FakeControlPlane::new()
            .with_operation_failure(ExposeError::Api {
                status: 503,
                message: "backend unavailable".into(),
            })
            .with_operation_states(&[OperationState::InProgress])
            .with_operation_failure(ExposeError::Api {
                status: 502,
                message: "bad gateway".into(),
            });

        wait_for_operation(&cp, &op(), &policy(5, 600)).await.unwrap();

        assert_eq!(cp.count("get_operation"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_query_failures_give_up() {
        let mut cp = FakeControlPlane::new();
        for _ in 0..=MAX_QUERY_FAILURES {
            cp = cp.with_operation_failure(ExposeError::Api {
                status: 500,
                message: "internal".into(),
            });
        }

        let err = wait_for_operation(&cp, &op(), &policy(5, 600))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExposeError::StatusQuery { attempts, .. } if attempts == MAX_QUERY_FAILURES + 1
        ));
        assert_eq!(cp.count("get_operation"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_is_not_retried() {
        let cp = FakeControlPlane::new()
            .with_operation_failure(ExposeError::Auth("token expired".into()));

        let err = wait_for_operation(&cp, &op(), &policy(5, 600))
            .await
            .unwrap_err();

        assert!(matches!(err, ExposeError::Auth(_)));
        assert_eq!(cp.count("get_operation"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_certificate_becomes_active() {
        let cp = FakeControlPlane::new().with_certificate_states(&[
            CertificateStatus::Provisioning,
            CertificateStatus::ProvisioningFailed,
            CertificateStatus::Provisioning,
        ]);
        let start = Instant::now();

        let cert = wait_for_certificate(&cp, "lb-cert", &policy(15, 3600))
            .await
            .unwrap();

        assert_eq!(cert.status, CertificateStatus::Active);
        assert_eq!(cp.count("get_ssl_certificate"), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_certificate_permanent_failure() {
        let cp = FakeControlPlane::new()
            .with_certificate_states(&[CertificateStatus::ProvisioningFailedPermanently]);

        let err = wait_for_certificate(&cp, "lb-cert", &policy(15, 3600))
            .await
            .unwrap_err();

        assert!(matches!(err, ExposeError::CertificateFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_certificate_wait_is_bounded() {
        let pending = vec![CertificateStatus::Provisioning; 10];
        let cp = FakeControlPlane::new().with_certificate_states(&pending);

        let err = wait_for_certificate(&cp, "lb-cert", &policy(15, 30))
            .await
            .unwrap_err();

        assert!(matches!(err, ExposeError::Timeout { secs: 30, .. }));
        assert_eq!(cp.count("get_ssl_certificate"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_waits_without_deadline() {
        let pending = vec![CertificateStatus::Provisioning; 500];
        let cp = FakeControlPlane::new().with_certificate_states(&pending);

        wait_for_certificate(&cp, "lb-cert", &policy(15, 0))
            .await
            .unwrap();

        assert_eq!(cp.count("get_ssl_certificate"), 501);
    }

    #[test]
    fn test_default_policies() {
        let ops = WaitPolicy::default();
        assert_eq!(ops.interval, Duration::from_secs(5));
        assert_eq!(ops.timeout, Some(Duration::from_secs(600)));

        let certs = WaitPolicy::certificates();
        assert_eq!(certs.timeout, Some(Duration::from_secs(3600)));

        assert_eq!(WaitPolicy::from_secs(5, 0, 3).unwrap().timeout, None);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            WaitPolicy::from_secs(0, 600, 3),
            Err(ExposeError::Config(_))
        ));
        assert!(WaitPolicy::bounded_from_secs(0, 600, 3).is_err());
    }

    #[test]
    fn test_operation_policy_requires_deadline() {
        assert!(matches!(
            WaitPolicy::bounded_from_secs(5, 0, 3),
            Err(ExposeError::Config(_))
        ));
        let policy = WaitPolicy::bounded_from_secs(5, 30, 3).unwrap();
        assert_eq!(policy.timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_operation_wait_refused() {
        let cp = FakeControlPlane::new()
            .with_operation_states(&[OperationState::InProgress; 1000]);
        let unbounded = WaitPolicy {
            timeout: None,
            ..WaitPolicy::operations().quiet()
        };

        let err = wait_for_operation(&cp, &op(), &unbounded).await.unwrap_err();

        assert!(matches!(err, ExposeError::Config(_)));
        assert_eq!(cp.count("get_operation"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_polls() {
        let cp = FakeControlPlane::new()
            .with_certificate_states(&vec![CertificateStatus::Provisioning; 1000]);
        let busy = WaitPolicy {
            interval: Duration::ZERO,
            ..WaitPolicy::certificates().quiet()
        };

        let err = wait_for_certificate(&cp, "lb-cert", &busy).await.unwrap_err();

        assert!(matches!(err, ExposeError::Config(_)));
        assert_eq!(cp.count("get_ssl_certificate"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failures_count_against_deadline() {
        // Failures never exceed the tolerated streak, so only the deadline ends the wait.
        let mut cp = FakeControlPlane::new();
        for _ in 0..10 {
            cp = cp
                .with_operation_failure(ExposeError::Api {
                    status: 503,
                    message: "backend unavailable".into(),
                })
                .with_operation_states(&[OperationState::InProgress]);
        }
        let start = Instant::now();

        let err = wait_for_operation(&cp, &op(), &policy(5, 20))
            .await
            .unwrap_err();

        assert!(matches!(err, ExposeError::Timeout { secs: 20, .. }));
        // Polls at 0, 5, 10, 15 and 20 seconds, alternating failure and pending.
        assert_eq!(cp.count("get_operation"), 5);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_query_at_deadline_times_out() {
        let mut cp = FakeControlPlane::new();
        for _ in 0..3 {
            cp = cp.with_operation_failure(ExposeError::Api {
                status: 503,
                message: "backend unavailable".into(),
            });
        }
        let tolerant = WaitPolicy::from_secs(5, 10, 5).unwrap().quiet();

        let err = wait_for_operation(&cp, &op(), &tolerant).await.unwrap_err();

        assert!(matches!(err, ExposeError::Timeout { secs: 10, .. }));
        assert_eq!(cp.count("get_operation"), 3);
    }
}
