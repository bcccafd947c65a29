//! Live site adapter
//!
//! Implements the site collaborators and the audit log on top of the site's
//! administrative cmdlets. Records are projected to the shared model's field
//! names inside the pipeline so they deserialize directly.

use super::powershell::{PowerShell, quote};
use super::{DirectoryService, RemovalService, TaskService};
use crate::audit::{AuditLog, OperationId, OperationRequest};
use crate::config::AdapterConfig;
use anyhow::{Context, Result};
use hosting_teardown_common::defaults::AUDIT_SOURCE;
use hosting_teardown_common::{HostingConnection, ProvisioningTask, ResourceUnit};
use tracing::debug;

/// Strip the provider prefix from a `PSPath`
const PATH_EXPR: &str = "($_.PSPath -replace '^.*::','')";

/// Site reached through PowerShell
#[derive(Debug, Clone)]
pub struct PowerShellSite {
    ps: PowerShell,
}

impl PowerShellSite {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            ps: PowerShell::new(config),
        }
    }

    /// Check that the administrative endpoint answers
    pub async fn check_reachable(&self) -> Result<()> {
        self.ps
            .run(
                "Get-BrokerSite",
                &format!("Get-BrokerSite -AdminAddress {} | Out-Null", self.ps.admin_address()),
            )
            .await
            .map(|_| ())
            .context("Delivery controller is not reachable")
    }

    fn list_connections_pipeline() -> String {
        format!(
            "Get-ChildItem -Path 'XDHyp:\\Connections' | Select-Object \
             @{{n='name';e={{$_.HypervisorConnectionName}}}}, \
             @{{n='uid';e={{[string]$_.HypervisorConnectionUid}}}}, \
             @{{n='path';e={{{PATH_EXPR}}}}}"
        )
    }

    fn list_units_pipeline(connection: &str) -> String {
        format!(
            "Get-ChildItem -Path 'XDHyp:\\HostingUnits' | \
             Where-Object {{ $_.HypervisorConnection.HypervisorConnectionName -eq {} }} | \
             Select-Object \
             @{{n='id';e={{[string]$_.HostingUnitUid}}}}, \
             @{{n='name';e={{$_.HostingUnitName}}}}, \
             @{{n='connection';e={{$_.HypervisorConnection.HypervisorConnectionName}}}}, \
             @{{n='link_id';e={{[string]$_.HostingUnitUid}}}}, \
             @{{n='path';e={{{PATH_EXPR}}}}}",
            quote(connection)
        )
    }

    fn find_active_task_pipeline(&self) -> String {
        // At most one active task across the site, as the task service reports it.
        format!(
            "Get-ProvTask -AdminAddress {} -Active $true -MaxRecordCount 1 | Select-Object \
             @{{n='id';e={{[string]$_.TaskId}}}}, \
             @{{n='active';e={{[bool]$_.Active}}}}, \
             @{{n='resource_unit_id';e={{[string]$_.HostingUnitUid}}}}, \
             @{{n='kind';e={{[string]$_.Type}}}}",
            self.ps.admin_address()
        )
    }
}

impl DirectoryService for PowerShellSite {
    async fn list_hosting_connections(&self) -> Result<Vec<HostingConnection>> {
        self.ps
            .query("Get-ChildItem XDHyp:\\Connections", &Self::list_connections_pipeline())
            .await
    }

    async fn list_resource_units(&self, connection: &str) -> Result<Vec<ResourceUnit>> {
        self.ps
            .query(
                "Get-ChildItem XDHyp:\\HostingUnits",
                &Self::list_units_pipeline(connection),
            )
            .await
    }
}

impl TaskService for PowerShellSite {
    async fn find_active_task(&self, resource_unit_id: &str) -> Result<Option<ProvisioningTask>> {
        debug!(resource_unit_id = %resource_unit_id, "Querying active provisioning task");
        let mut tasks: Vec<ProvisioningTask> = self
            .ps
            .query("Get-ProvTask", &self.find_active_task_pipeline())
            .await?;
        Ok(if tasks.is_empty() {
            None
        } else {
            Some(tasks.swap_remove(0))
        })
    }

    async fn stop_task(&self, task_id: &str, logging_id: &OperationId) -> Result<()> {
        self.ps
            .run(
                "Stop-ProvTask",
                &format!(
                    "Stop-ProvTask -AdminAddress {} -TaskId {} -LoggingId {}",
                    self.ps.admin_address(),
                    quote(task_id),
                    quote(logging_id.as_str())
                ),
            )
            .await
            .map(|_| ())
    }

    async fn remove_task(&self, task_id: &str, logging_id: &OperationId) -> Result<()> {
        self.ps
            .run(
                "Remove-ProvTask",
                &format!(
                    "Remove-ProvTask -AdminAddress {} -TaskId {} -LoggingId {}",
                    self.ps.admin_address(),
                    quote(task_id),
                    quote(logging_id.as_str())
                ),
            )
            .await
            .map(|_| ())
    }
}

impl RemovalService for PowerShellSite {
    async fn remove_resource_unit(&self, unit: &ResourceUnit, logging_id: &OperationId) -> Result<()> {
        self.ps
            .run("Remove-Item", &remove_item(&unit.config_path(), logging_id))
            .await
            .map(|_| ())
    }

    async fn remove_hosting_connection(
        &self,
        connection: &HostingConnection,
        logging_id: &OperationId,
    ) -> Result<()> {
        self.ps
            .run("Remove-Item", &remove_item(&connection.config_path(), logging_id))
            .await
            .map(|_| ())
    }

    async fn remove_broker_registration(
        &self,
        connection_name: &str,
        logging_id: &OperationId,
    ) -> Result<()> {
        self.ps
            .run(
                "Remove-BrokerHypervisorConnection",
                &format!(
                    "Remove-BrokerHypervisorConnection -AdminAddress {} -Name {} -LoggingId {}",
                    self.ps.admin_address(),
                    quote(connection_name),
                    quote(logging_id.as_str())
                ),
            )
            .await
            .map(|_| ())
    }
}

/// Remove a configuration-store item, linked to a high-level operation
fn remove_item(path: &str, logging_id: &OperationId) -> String {
    format!(
        "Remove-Item -LiteralPath {} -LoggingId {}",
        quote(path),
        quote(logging_id.as_str())
    )
}

impl AuditLog for PowerShellSite {
    async fn open(&self, request: &OperationRequest) -> Result<OperationId> {
        let targets = request
            .targets
            .iter()
            .map(|t| quote(t))
            .collect::<Vec<_>>()
            .join(",");
        let body = format!(
            "$op = Start-LogHighLevelOperation -AdminAddress {} -Source {} -Text {} \
             -OperationType AdminActivity -TargetTypes {} -StartTime (Get-Date); \
             Write-Output ([string]$op.Id)",
            self.ps.admin_address(),
            quote(AUDIT_SOURCE),
            quote(&request.label),
            if targets.is_empty() { "@()".to_string() } else { targets },
        );
        let output = self.ps.run("Start-LogHighLevelOperation", &body).await?;
        let id = output.trim();
        anyhow::ensure!(!id.is_empty(), "Start-LogHighLevelOperation returned no id");
        Ok(OperationId::new(id))
    }

    async fn close(&self, id: &OperationId, success: bool) -> Result<()> {
        let body = format!(
            "Stop-LogHighLevelOperation -AdminAddress {} -HighLevelOperationId {} \
             -IsSuccessful ${} -EndTime (Get-Date)",
            self.ps.admin_address(),
            quote(id.as_str()),
            success
        );
        self.ps
            .run("Stop-LogHighLevelOperation", &body)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_pipeline_filters_by_connection() {
        let pipeline = PowerShellSite::list_units_pipeline("HV'1");
        assert!(pipeline.contains("-eq 'HV''1'"));
        assert!(pipeline.contains("@{n='id';e={[string]$_.HostingUnitUid}}"));
        assert!(pipeline.contains("@{n='path';e={($_.PSPath -replace '^.*::','')}}"));
    }

    #[test]
    fn test_connections_pipeline_projects_model_fields() {
        let pipeline = PowerShellSite::list_connections_pipeline();
        assert!(pipeline.starts_with("Get-ChildItem -Path 'XDHyp:\\Connections'"));
        for field in ["'name'", "'uid'", "'path'"] {
            assert!(pipeline.contains(field), "missing {field}");
        }
    }

    #[test]
    fn test_task_pipeline_asks_for_one_active_task() {
        let site = PowerShellSite::new(&AdapterConfig::default());
        let pipeline = site.find_active_task_pipeline();
        assert!(pipeline.starts_with("Get-ProvTask -AdminAddress 'localhost' -Active $true"));
        assert!(pipeline.contains("-MaxRecordCount 1"));
        assert!(pipeline.contains("'resource_unit_id'"));
    }

    #[test]
    fn test_removal_is_linked_to_operation() {
        let script = remove_item(r"XDHyp:\HostingUnits\RU 1", &OperationId::new("6f1c"));
        assert_eq!(
            script,
            r"Remove-Item -LiteralPath 'XDHyp:\HostingUnits\RU 1' -LoggingId '6f1c'"
        );
    }
}
