//! Teardown orchestration
//!
//! Drives one hosting connection through the teardown phases:
//!
//! 1. Selection: the named connection must be among the listed ones
//! 2. Discovery: its units are scanned for an active provisioning task
//! 3. Drain: stop and remove tasks, re-scanning after each pair, until no
//!    active task is surfaced or a handled task resurfaces. An optional
//!    iteration cap ends the run here, before anything is removed.
//! 4. Child removal: the connection's units (only the saved unit when
//!    `resource_only`)
//! 5. Parent removal: the connection object, then its broker registration
//!
//! Listing and query failures abort the run. Individual destructive steps
//! never do; their outcomes land in the [`TeardownReport`].

pub mod discovery;
pub mod step;
pub mod types;

pub use discovery::scan;
pub use step::{Mutation, execute_step};
pub use types::{DiscoveredTask, Disposition, StepRecord, TeardownReport};

use crate::audit::AuditLog;
use crate::config::TeardownConfig;
use crate::confirm::ConfirmationGate;
use crate::error::TeardownError;
use crate::site::SiteOperations;
use hosting_teardown_common::{HostingConnection, ProvisioningTask, ResourceUnit};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Orchestrates the teardown of one hosting connection
pub struct TeardownOrchestrator<'a, S, A, G: ?Sized> {
    site: &'a S,
    audit: &'a A,
    gate: &'a mut G,
    config: TeardownConfig,
}

impl<'a, S, A, G> TeardownOrchestrator<'a, S, A, G>
where
    S: SiteOperations,
    A: AuditLog,
    G: ConfirmationGate + ?Sized,
{
    pub fn new(site: &'a S, audit: &'a A, gate: &'a mut G, config: TeardownConfig) -> Self {
        Self {
            site,
            audit,
            gate,
            config,
        }
    }

    /// Tear down the hosting connection named `connection_name`
    #[instrument(skip(self), fields(resource_only = self.config.resource_only))]
    pub async fn run(&mut self, connection_name: &str) -> Result<TeardownReport, TeardownError> {
        let mut report = TeardownReport::new(connection_name, self.config.resource_only);

        let connection = self.select(connection_name).await?;
        let units = self.units(&connection.name).await?;
        if units.is_empty() {
            return Err(TeardownError::NoResourceUnits {
                name: connection.name.clone(),
            });
        }

        let Some(found) = scan(self.site, &units).await? else {
            info!(connection = %connection.name, "No active tasks found");
            return Ok(report);
        };

        info!(
            task_id = %found.task.id,
            unit_id = %found.unit_id,
            "Active task found, draining"
        );
        report.disposition = Disposition::Completed;
        report.saved_unit_id = Some(found.unit_id.clone());

        if !self.drain(found.task, &units, &mut report).await? {
            report.disposition = Disposition::DrainTruncated;
            warn!(summary = %report.summary(), "Teardown stopped before removals");
            return Ok(report);
        }
        self.remove_units(&connection, &found.unit_id, &mut report)
            .await?;
        if !self.config.resource_only {
            self.remove_parent(&connection, &mut report).await;
        }

        info!(summary = %report.summary(), "Teardown finished");
        Ok(report)
    }

    async fn select(&self, name: &str) -> Result<HostingConnection, TeardownError> {
        let connections = self
            .site
            .list_hosting_connections()
            .await
            .map_err(|e| TeardownError::unavailable("ListHostingConnections", e))?;

        connections
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TeardownError::ConnectionNotFound {
                name: name.to_string(),
            })
    }

    async fn units(&self, connection: &str) -> Result<Vec<ResourceUnit>, TeardownError> {
        self.site
            .list_resource_units(connection)
            .await
            .map_err(|e| TeardownError::unavailable("ListResourceUnits", e))
    }

    /// Returns `false` when the iteration cap stopped the drain with an
    /// active task still surfaced.
    async fn drain(
        &mut self,
        first: ProvisioningTask,
        units: &[ResourceUnit],
        report: &mut TeardownReport,
    ) -> Result<bool, TeardownError> {
        let mut handled: HashSet<String> = HashSet::new();
        let mut iterations = 0u32;
        let mut current = Some(first);

        while let Some(task) = current {
            if !handled.insert(task.id.clone()) {
                warn!(task_id = %task.id, "Task surfaced again after being handled, ending drain");
                break;
            }
            if self.config.max_drain_iterations.is_some_and(|cap| iterations >= cap) {
                warn!(
                    iterations,
                    task_id = %task.id,
                    "Drain iteration cap reached with an active task left"
                );
                return Ok(false);
            }
            iterations += 1;

            let stop = execute_step(self.site, self.audit, &mut *self.gate, Mutation::StopTask(&task.id)).await;
            report.steps.push(stop);
            let remove =
                execute_step(self.site, self.audit, &mut *self.gate, Mutation::RemoveTask(&task.id)).await;
            report.steps.push(remove);

            current = scan(self.site, units).await?.map(|found| found.task);
        }

        Ok(true)
    }

    async fn remove_units(
        &mut self,
        connection: &HostingConnection,
        saved_unit_id: &str,
        report: &mut TeardownReport,
    ) -> Result<(), TeardownError> {
        let resource_only = self.config.resource_only;
        let units = self.units(&connection.name).await?;

        for unit in units
            .iter()
            .filter(|u| !resource_only || u.id == saved_unit_id)
        {
            let record = execute_step(
                self.site,
                self.audit,
                &mut *self.gate,
                Mutation::RemoveResourceUnit(unit),
            )
            .await;
            report.steps.push(record);
        }

        Ok(())
    }

    async fn remove_parent(&mut self, connection: &HostingConnection, report: &mut TeardownReport) {
        let record = execute_step(
            self.site,
            self.audit,
            &mut *self.gate,
            Mutation::RemoveHostingConnection(connection),
        )
        .await;
        report.steps.push(record);

        let record = execute_step(
            self.site,
            self.audit,
            &mut *self.gate,
            Mutation::RemoveBrokerRegistration(&connection.name),
        )
        .await;
        report.steps.push(record);
    }
}

/// Run a teardown with a fresh orchestrator
pub async fn run_teardown<S, A, G>(
    site: &S,
    audit: &A,
    gate: &mut G,
    config: TeardownConfig,
    connection_name: &str,
) -> Result<TeardownReport, TeardownError>
where
    S: SiteOperations,
    A: AuditLog,
    G: ConfirmationGate + ?Sized,
{
    TeardownOrchestrator::new(site, audit, gate, config)
        .run(connection_name)
        .await
}
