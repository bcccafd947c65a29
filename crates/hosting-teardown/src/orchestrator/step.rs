//! Step execution: confirm, open audit operation, call, close

use super::types::StepRecord;
use crate::audit::{AuditLog, OperationId, OperationRequest};
use crate::confirm::ConfirmationGate;
use crate::site::SiteOperations;
use anyhow::Result;
use hosting_teardown_common::{HostingConnection, ResourceUnit, StepKind, StepOutcome};
use tracing::{info, warn};

/// A destructive call against the site
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'t> {
    StopTask(&'t str),
    RemoveTask(&'t str),
    RemoveResourceUnit(&'t ResourceUnit),
    RemoveHostingConnection(&'t HostingConnection),
    RemoveBrokerRegistration(&'t str),
}

impl Mutation<'_> {
    pub fn kind(&self) -> StepKind {
        match self {
            Mutation::StopTask(_) => StepKind::StopTask,
            Mutation::RemoveTask(_) => StepKind::RemoveTask,
            Mutation::RemoveResourceUnit(_) => StepKind::RemoveResourceUnit,
            Mutation::RemoveHostingConnection(_) => StepKind::RemoveHostingConnection,
            Mutation::RemoveBrokerRegistration(_) => StepKind::RemoveBrokerRegistration,
        }
    }

    /// Identifier recorded in the report and the audit label
    pub fn target(&self) -> &str {
        match self {
            Mutation::StopTask(id) | Mutation::RemoveTask(id) => id,
            Mutation::RemoveResourceUnit(unit) => &unit.id,
            Mutation::RemoveHostingConnection(conn) => &conn.name,
            Mutation::RemoveBrokerRegistration(name) => name,
        }
    }

    /// What the operator is asked about: store paths for configuration objects
    pub fn subject(&self) -> String {
        match self {
            Mutation::RemoveResourceUnit(unit) => unit.config_path(),
            Mutation::RemoveHostingConnection(conn) => conn.config_path(),
            other => other.target().to_string(),
        }
    }

    async fn apply<S: SiteOperations>(&self, site: &S, logging_id: &OperationId) -> Result<()> {
        match self {
            Mutation::StopTask(id) => site.stop_task(id, logging_id).await,
            Mutation::RemoveTask(id) => site.remove_task(id, logging_id).await,
            Mutation::RemoveResourceUnit(unit) => site.remove_resource_unit(unit, logging_id).await,
            Mutation::RemoveHostingConnection(conn) => {
                site.remove_hosting_connection(conn, logging_id).await
            }
            Mutation::RemoveBrokerRegistration(name) => {
                site.remove_broker_registration(name, logging_id).await
            }
        }
    }
}

/// Run one destructive step.
///
/// Never fails: the outcome is in the returned record. A declined step
/// issues no call and opens no audit operation. When the audit operation
/// cannot be opened the call is not issued.
pub async fn execute_step<S, A, G>(
    site: &S,
    audit: &A,
    gate: &mut G,
    mutation: Mutation<'_>,
) -> StepRecord
where
    S: SiteOperations,
    A: AuditLog,
    G: ConfirmationGate + ?Sized,
{
    let kind = mutation.kind();
    let target = mutation.target().to_string();
    let mut record = StepRecord {
        kind,
        target: target.clone(),
        outcome: StepOutcome::Declined,
        operation: None,
    };

    if !gate.confirm(&mutation.subject(), kind.action()) {
        info!(kind = %kind, target = %target, "Step declined");
        return record;
    }

    let request = OperationRequest::for_step(kind, &target);
    let operation = match audit.open(&request).await {
        Ok(id) => id,
        Err(e) => {
            warn!(kind = %kind, target = %target, error = ?e, "Could not open audit operation, skipping call");
            record.outcome = StepOutcome::failed(format!("audit operation could not be opened: {e:#}"));
            return record;
        }
    };

    let result = mutation.apply(site, &operation).await;

    if let Err(e) = audit.close(&operation, result.is_ok()).await {
        warn!(operation_id = %operation, kind = %kind, error = ?e, "Failed to close audit operation");
    }
    record.operation = Some(operation);

    match result {
        Ok(()) => {
            info!(kind = %kind, target = %target, "Step succeeded");
            record.outcome = StepOutcome::Succeeded;
        }
        Err(e) => {
            record.outcome = StepOutcome::failed(format!("{e:#}"));
            if let Some(err) = record.error() {
                warn!(error = %err, "Step failed");
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::confirm::{AlwaysGate, MockConfirmationGate};
    use crate::site::{InMemorySite, SiteCall};
    use hosting_teardown_common::ProvisioningTask;

    fn site() -> InMemorySite {
        let site = InMemorySite::new();
        site.add_connection("HV1")
            .add_unit(ResourceUnit::new("RU1", "HV1"))
            .add_task(ProvisioningTask::active("T1", "RU1"));
        site
    }

    #[tokio::test]
    async fn test_granted_step_is_bracketed() {
        let site = site();
        let audit = MemoryAuditLog::new();
        let record = execute_step(&site, &audit, &mut AlwaysGate(true), Mutation::StopTask("T1")).await;

        assert_eq!(record.outcome, StepOutcome::Succeeded);
        assert_eq!(site.mutations(), vec![SiteCall::StopTask("T1".to_string())]);
        let entries = audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].success, Some(true));
        assert_eq!(record.operation.as_ref(), Some(&entries[0].id));
        assert_eq!(site.logging_ids(), vec![entries[0].id.clone()]);
    }

    #[tokio::test]
    async fn test_declined_step_does_nothing() {
        let site = site();
        let audit = MemoryAuditLog::new();
        let mut gate = MockConfirmationGate::new();
        gate.expect_confirm()
            .withf(|subject, action| {
                subject.to_string() == "T1" && action.to_string() == "Remove provisioning task"
            })
            .times(1)
            .return_const(false);

        let record = execute_step(&site, &audit, &mut gate, Mutation::RemoveTask("T1")).await;

        assert_eq!(record.outcome, StepOutcome::Declined);
        assert!(record.operation.is_none());
        assert!(site.mutations().is_empty());
        assert_eq!(audit.open_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_call_closes_unsuccessfully() {
        let site = site();
        site.fail_on(StepKind::RemoveResourceUnit, "RU1");
        let audit = MemoryAuditLog::new();
        let unit = ResourceUnit::new("RU1", "HV1");

        let record =
            execute_step(&site, &audit, &mut AlwaysGate(true), Mutation::RemoveResourceUnit(&unit)).await;

        assert!(record.outcome.is_failure());
        assert!(audit.unclosed().is_empty());
        assert_eq!(audit.entries()[0].success, Some(false));
    }

    #[tokio::test]
    async fn test_audit_open_failure_skips_call() {
        let site = site();
        let audit = MemoryAuditLog::new();
        audit.fail_open_for(StepKind::StopTask);

        let record = execute_step(&site, &audit, &mut AlwaysGate(true), Mutation::StopTask("T1")).await;

        assert!(record.outcome.is_failure());
        assert!(site.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_close_failure_keeps_call_outcome() {
        let site = site();
        let audit = MemoryAuditLog::new();
        audit.fail_close(true);

        let record = execute_step(&site, &audit, &mut AlwaysGate(true), Mutation::StopTask("T1")).await;

        assert_eq!(record.outcome, StepOutcome::Succeeded);
        assert!(audit.unclosed().is_empty());
    }

    #[test]
    fn test_subjects_use_store_paths() {
        let unit = ResourceUnit::new("RU1", "HV1");
        let conn = HostingConnection::named("HV1");
        assert_eq!(Mutation::RemoveResourceUnit(&unit).subject(), r"XDHyp:\HostingUnits\RU1");
        assert_eq!(Mutation::RemoveResourceUnit(&unit).target(), "RU1");
        assert_eq!(Mutation::RemoveHostingConnection(&conn).subject(), r"XDHyp:\Connections\HV1");
        assert_eq!(Mutation::RemoveBrokerRegistration("HV1").subject(), "HV1");
    }
}
