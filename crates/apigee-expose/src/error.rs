//! Error type shared by the control-plane client, the waiters and the
//! provisioning pipeline.

use thiserror::Error;

/// Errors that can occur while provisioning.
#[derive(Error, Debug)]
pub enum ExposeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required environment variable or tool is missing.
    #[error("Prerequisites not met: {0}")]
    Prerequisite(String),

    /// A waited-on resource did not converge before the deadline.
    #[error("Timed out after {secs} seconds waiting for {target}")]
    Timeout { target: String, secs: u64 },

    /// A long-running operation finished with an error.
    #[error("Operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },

    /// A managed certificate can no longer become active.
    #[error("Certificate {name} failed to provision: {status}")]
    CertificateFailed { name: String, status: String },

    /// Status lookups kept failing while polling.
    #[error("Status query for {target} failed {attempts} times in a row: {source}")]
    StatusQuery {
        target: String,
        attempts: u32,
        #[source]
        source: Box<ExposeError>,
    },

    /// An external command exited unsuccessfully.
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExposeError {
    /// Whether a status query that failed with this error may succeed if
    /// repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Serialization(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ExposeError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(ExposeError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_transient());
        assert!(!ExposeError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!ExposeError::Auth("expired".into()).is_transient());
        assert!(!ExposeError::NotFound("op".into()).is_transient());

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ExposeError::Serialization(parse).is_transient());
    }

    #[test]
    fn test_timeout_message_names_target() {
        let err = ExposeError::Timeout {
            target: "operation 1234".into(),
            secs: 600,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 600 seconds waiting for operation 1234"
        );
    }
}
