//! Teardown and configuration errors
//!
//! Fatal errors (`Unavailable`, the two not-found variants) abort a run.
//! `StepFailed` and `Declined` describe individual steps; the orchestrator
//! records them in the report instead of returning them.

use hosting_teardown_common::StepKind;
use std::error::Error as StdError;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by the teardown protocol
#[derive(Debug, Error)]
pub enum TeardownError {
    /// A listing or query call could not be completed
    #[error("{operation} could not be completed")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The chosen hosting connection is not among the enumerated ones
    #[error("Hosting connection '{name}' not found")]
    ConnectionNotFound { name: String },

    /// The chosen hosting connection has no resource units
    #[error("No resource units resolve for hosting connection '{name}'")]
    NoResourceUnits { name: String },

    /// A single stop/remove call failed
    #[error("{kind} failed for '{target}': {reason}")]
    StepFailed {
        kind: StepKind,
        target: String,
        reason: String,
    },

    /// Confirmation was withheld for a single step
    #[error("{kind} declined for '{target}'")]
    Declined { kind: StepKind, target: String },
}

impl TeardownError {
    /// Wrap a collaborator failure as `Unavailable`
    pub fn unavailable(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Unavailable {
            operation,
            source: source.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TeardownError::ConnectionNotFound { .. } | TeardownError::NoResourceUnits { .. }
        )
    }

    /// Check if this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TeardownError::StepFailed { .. } | TeardownError::Declined { .. }
        )
    }
}

/// Site snapshot loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the snapshot file
    #[error("Failed to read snapshot '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the snapshot JSON
    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// A record in the snapshot failed validation
    #[error("Invalid snapshot: {0}")]
    Invalid(#[from] garde::Report),

    /// Two hosting connections share a name
    #[error("Duplicate hosting connection name: {0}")]
    DuplicateConnection(String),

    /// A resource unit references a connection that is not in the snapshot
    #[error("Resource unit '{unit}' references unknown hosting connection '{connection}'")]
    UnknownConnection { unit: String, connection: String },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TeardownError::ConnectionNotFound {
                name: "HV9".to_string()
            }
            .to_string(),
            "Hosting connection 'HV9' not found"
        );
        assert_eq!(
            TeardownError::StepFailed {
                kind: StepKind::StopTask,
                target: "T1".to_string(),
                reason: "access denied".to_string(),
            }
            .to_string(),
            "stop-task failed for 'T1': access denied"
        );
    }

    #[test]
    fn test_unavailable_keeps_cause() {
        let err = TeardownError::unavailable(
            "ListHostingConnections",
            anyhow::anyhow!("controller unreachable"),
        );
        assert_eq!(err.to_string(), "ListHostingConnections could not be completed");
        let cause = err.source().map(|s| s.to_string());
        assert_eq!(cause.as_deref(), Some("controller unreachable"));
    }

    #[test]
    fn test_classification() {
        assert!(
            TeardownError::NoResourceUnits {
                name: "HV1".to_string()
            }
            .is_not_found()
        );
        assert!(
            TeardownError::unavailable("FindActiveTask", anyhow::anyhow!("x")).is_fatal()
        );
        assert!(
            !TeardownError::Declined {
                kind: StepKind::RemoveTask,
                target: "T1".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::io("/path/to/site.json", io_err);
        assert!(err.to_string().contains("/path/to/site.json"));
    }
}
