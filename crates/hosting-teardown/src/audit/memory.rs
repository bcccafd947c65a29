//! In-memory audit log for tests and snapshot rehearsals

use super::{AuditLog, OperationId, OperationRequest};
use anyhow::{Result, bail};
use hosting_teardown_common::StepKind;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// One recorded operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: OperationId,
    pub request: OperationRequest,
    /// `None` while the operation is open
    pub success: Option<bool>,
}

impl AuditEntry {
    pub fn is_open(&self) -> bool {
        self.success.is_none()
    }
}

#[derive(Debug, Default)]
struct AuditState {
    entries: Vec<AuditEntry>,
    fail_open: HashSet<StepKind>,
    fail_close: bool,
}

/// Audit log that keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    state: Mutex<AuditState>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AuditState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `open` fail for steps of `kind`
    pub fn fail_open_for(&self, kind: StepKind) -> &Self {
        self.state().fail_open.insert(kind);
        self
    }

    /// Make every `close` fail after recording the status
    pub fn fail_close(&self, enabled: bool) -> &Self {
        self.state().fail_close = enabled;
        self
    }

    /// All operations, in open order
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.state().entries.clone()
    }

    /// Operations that were opened but never closed
    pub fn unclosed(&self) -> Vec<AuditEntry> {
        self.state()
            .entries
            .iter()
            .filter(|e| e.is_open())
            .cloned()
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.state().entries.len()
    }
}

impl AuditLog for MemoryAuditLog {
    async fn open(&self, request: &OperationRequest) -> Result<OperationId> {
        let mut state = self.state();
        if state.fail_open.contains(&request.kind) {
            bail!("audit log rejected operation '{}'", request.label);
        }
        let id = OperationId::new(format!("op-{}", state.entries.len() + 1));
        state.entries.push(AuditEntry {
            id: id.clone(),
            request: request.clone(),
            success: None,
        });
        Ok(id)
    }

    async fn close(&self, id: &OperationId, success: bool) -> Result<()> {
        let mut state = self.state();
        let fail_close = state.fail_close;
        let Some(entry) = state.entries.iter_mut().find(|e| &e.id == id) else {
            bail!("unknown operation '{}'", id);
        };
        if !entry.is_open() {
            bail!("operation '{}' is already closed", id);
        }
        entry.success = Some(success);
        if fail_close {
            bail!("audit log failed to close operation '{}'", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_close_pairs() {
        let log = MemoryAuditLog::new();
        let request = OperationRequest::for_step(StepKind::StopTask, "T1");
        let id = log.open(&request).await.unwrap();
        assert_eq!(log.unclosed().len(), 1);

        log.close(&id, false).await.unwrap();
        assert!(log.unclosed().is_empty());
        assert_eq!(log.entries()[0].success, Some(false));
    }

    #[tokio::test]
    async fn test_double_close_is_rejected() {
        let log = MemoryAuditLog::new();
        let id = log
            .open(&OperationRequest::for_step(StepKind::RemoveTask, "T1"))
            .await
            .unwrap();
        log.close(&id, true).await.unwrap();
        assert!(log.close(&id, true).await.is_err());
        assert!(log.close(&OperationId::new("op-99"), true).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_open_failure() {
        let log = MemoryAuditLog::new();
        log.fail_open_for(StepKind::RemoveResourceUnit);
        let request = OperationRequest::for_step(StepKind::RemoveResourceUnit, "RU1");
        assert!(log.open(&request).await.is_err());
        assert_eq!(log.open_count(), 0);
    }
}
