//! High-level operation audit log
//!
//! Every confirmed destructive step is bracketed by an `open`/`close` pair.
//! Sinks: the site's configuration log ([`crate::site::PowerShellSite`]),
//! the local SQLite ledger ([`LedgerAuditLog`]) and [`MemoryAuditLog`].

pub mod ledger;
pub mod memory;

pub use ledger::LedgerAuditLog;
pub use memory::MemoryAuditLog;

use anyhow::Result;
use hosting_teardown_common::StepKind;
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Metadata for a high-level operation about to start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRequest {
    /// Human-readable text, e.g. `Stop provisioning task T1`
    pub label: String,
    pub kind: StepKind,
    /// Target object types touched by the operation
    pub targets: Vec<String>,
}

impl OperationRequest {
    /// Request for one step against one subject
    pub fn for_step(kind: StepKind, subject: &str) -> Self {
        Self {
            label: format!("{} {}", kind.action(), subject),
            kind,
            targets: vec![kind.target_type().to_string()],
        }
    }
}

/// Opaque id handed out by [`AuditLog::open`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records high-level operations.
///
/// Each id returned by `open` must be passed to `close` exactly once.
pub trait AuditLog: Send + Sync {
    /// Start an operation and return its id
    fn open(&self, request: &OperationRequest)
    -> impl Future<Output = Result<OperationId>> + Send;

    /// Finish an operation with its terminal status
    fn close(&self, id: &OperationId, success: bool) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_for_step() {
        let request = OperationRequest::for_step(StepKind::StopTask, "T1");
        assert_eq!(request.label, "Stop provisioning task T1");
        assert_eq!(request.kind, StepKind::StopTask);
        assert_eq!(request.targets, vec!["ProvTask".to_string()]);
    }

    #[test]
    fn test_operation_id_serializes_as_string() {
        let id = OperationId::new("op-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"op-1\"");
        assert_eq!(id.to_string(), "op-1");
    }
}
