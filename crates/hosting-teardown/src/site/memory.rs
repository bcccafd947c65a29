//! In-process site
//!
//! Holds connections, units, tasks and broker registrations in memory and
//! applies removals to them. Every call is recorded in order so tests can
//! assert the exact sequence of mutations. Also backs `--snapshot`
//! rehearsals, where a JSON export of a site is torn down offline.

use super::{DirectoryService, RemovalService, TaskService};
use crate::audit::OperationId;
use crate::error::ConfigError;
use anyhow::{Result, bail};
use garde::Validate;
use hosting_teardown_common::{HostingConnection, ProvisioningTask, ResourceUnit, StepKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A call made against the in-memory site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteCall {
    ListHostingConnections,
    ListResourceUnits(String),
    FindActiveTask(String),
    StopTask(String),
    RemoveTask(String),
    RemoveResourceUnit(String),
    RemoveHostingConnection(String),
    RemoveBrokerRegistration(String),
}

impl SiteCall {
    /// Whether the call changes site state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            SiteCall::ListHostingConnections
                | SiteCall::ListResourceUnits(_)
                | SiteCall::FindActiveTask(_)
        )
    }
}

/// JSON export of a site, as accepted by `--snapshot`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SiteSnapshot {
    #[garde(dive)]
    pub connections: Vec<HostingConnection>,

    #[serde(default)]
    #[garde(dive)]
    pub units: Vec<ResourceUnit>,

    #[serde(default)]
    #[garde(dive)]
    pub tasks: Vec<ProvisioningTask>,

    /// Broker registrations by connection name; defaults to one per connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub broker_registrations: Option<Vec<String>>,
}

impl SiteSnapshot {
    /// Load and validate a snapshot file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Parse and validate snapshot JSON
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let snapshot: SiteSnapshot = serde_json::from_str(content)?;
        snapshot.validate()?;
        snapshot.check_references()?;
        Ok(snapshot)
    }

    fn check_references(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for conn in &self.connections {
            if !names.insert(conn.name.as_str()) {
                return Err(ConfigError::DuplicateConnection(conn.name.clone()));
            }
        }
        for unit in &self.units {
            if !names.contains(unit.connection.as_str()) {
                return Err(ConfigError::UnknownConnection {
                    unit: unit.id.clone(),
                    connection: unit.connection.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SiteState {
    connections: Vec<HostingConnection>,
    units: Vec<ResourceUnit>,
    tasks: Vec<ProvisioningTask>,
    broker_registrations: BTreeSet<String>,
    calls: Vec<SiteCall>,
    logging_ids: Vec<OperationId>,
    failures: HashSet<(StepKind, String)>,
    unavailable: bool,
    surface_any_active: bool,
}

/// In-memory implementation of all site collaborators
#[derive(Debug, Default)]
pub struct InMemorySite {
    state: Mutex<SiteState>,
}

impl InMemorySite {
    /// Empty site
    pub fn new() -> Self {
        Self::default()
    }

    /// Site populated from a snapshot
    pub fn from_snapshot(snapshot: SiteSnapshot) -> Self {
        let broker_registrations = snapshot
            .broker_registrations
            .unwrap_or_else(|| snapshot.connections.iter().map(|c| c.name.clone()).collect())
            .into_iter()
            .collect();

        Self {
            state: Mutex::new(SiteState {
                connections: snapshot.connections,
                units: snapshot.units,
                tasks: snapshot.tasks,
                broker_registrations,
                ..Default::default()
            }),
        }
    }

    /// Load a site from a snapshot file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        SiteSnapshot::load(path).map(Self::from_snapshot)
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a hosting connection together with its broker registration
    pub fn add_connection(&self, name: &str) -> &Self {
        let mut state = self.state();
        state.connections.push(HostingConnection::named(name));
        state.broker_registrations.insert(name.to_string());
        drop(state);
        self
    }

    pub fn add_unit(&self, unit: ResourceUnit) -> &Self {
        self.state().units.push(unit);
        self
    }

    pub fn add_task(&self, task: ProvisioningTask) -> &Self {
        self.state().tasks.push(task);
        self
    }

    /// Make the mutation of `kind` against `target` fail
    pub fn fail_on(&self, kind: StepKind, target: &str) -> &Self {
        self.state().failures.insert((kind, target.to_string()));
        self
    }

    /// Make every listing and query call fail
    pub fn set_unavailable(&self, unavailable: bool) -> &Self {
        self.state().unavailable = unavailable;
        self
    }

    /// Report the first active task in the whole site, whatever unit is asked about
    pub fn surface_any_active_task(&self, enabled: bool) -> &Self {
        self.state().surface_any_active = enabled;
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<SiteCall> {
        self.state().calls.clone()
    }

    /// Mutating calls made so far, in order
    pub fn mutations(&self) -> Vec<SiteCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    /// Logging ids passed with each mutating call, in call order
    pub fn logging_ids(&self) -> Vec<OperationId> {
        self.state().logging_ids.clone()
    }

    pub fn connection_names(&self) -> Vec<String> {
        self.state()
            .connections
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn unit_ids(&self) -> Vec<String> {
        self.state().units.iter().map(|u| u.id.clone()).collect()
    }

    pub fn tasks(&self) -> Vec<ProvisioningTask> {
        self.state().tasks.clone()
    }

    pub fn has_broker_registration(&self, name: &str) -> bool {
        self.state().broker_registrations.contains(name)
    }

    fn record_query(&self, call: SiteCall) -> Result<MutexGuard<'_, SiteState>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.unavailable {
            bail!("administrative endpoint unavailable");
        }
        Ok(state)
    }

    fn record_mutation(
        &self,
        call: SiteCall,
        kind: StepKind,
        target: &str,
        logging_id: &OperationId,
    ) -> Result<MutexGuard<'_, SiteState>> {
        let mut state = self.state();
        debug!(call = ?call, logging_id = %logging_id, "In-memory mutation");
        state.calls.push(call);
        state.logging_ids.push(logging_id.clone());
        if state.failures.contains(&(kind, target.to_string())) {
            bail!("{} rejected by site for '{}'", kind.action(), target);
        }
        Ok(state)
    }
}

impl DirectoryService for InMemorySite {
    async fn list_hosting_connections(&self) -> Result<Vec<HostingConnection>> {
        let state = self.record_query(SiteCall::ListHostingConnections)?;
        Ok(state.connections.clone())
    }

    async fn list_resource_units(&self, connection: &str) -> Result<Vec<ResourceUnit>> {
        let state = self.record_query(SiteCall::ListResourceUnits(connection.to_string()))?;
        Ok(state
            .units
            .iter()
            .filter(|u| u.connection == connection)
            .cloned()
            .collect())
    }
}

impl TaskService for InMemorySite {
    async fn find_active_task(&self, resource_unit_id: &str) -> Result<Option<ProvisioningTask>> {
        let state = self.record_query(SiteCall::FindActiveTask(resource_unit_id.to_string()))?;
        let any = state.surface_any_active;
        Ok(state
            .tasks
            .iter()
            .find(|t| t.active && (any || t.resource_unit_id == resource_unit_id))
            .cloned())
    }

    async fn stop_task(&self, task_id: &str, logging_id: &OperationId) -> Result<()> {
        let mut state = self.record_mutation(
            SiteCall::StopTask(task_id.to_string()),
            StepKind::StopTask,
            task_id,
            logging_id,
        )?;
        match state.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.active = false;
                Ok(())
            }
            None => bail!("task '{}' not found", task_id),
        }
    }

    async fn remove_task(&self, task_id: &str, logging_id: &OperationId) -> Result<()> {
        let mut state = self.record_mutation(
            SiteCall::RemoveTask(task_id.to_string()),
            StepKind::RemoveTask,
            task_id,
            logging_id,
        )?;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != task_id);
        if state.tasks.len() == before {
            bail!("task '{}' not found", task_id);
        }
        Ok(())
    }
}

impl RemovalService for InMemorySite {
    async fn remove_resource_unit(&self, unit: &ResourceUnit, logging_id: &OperationId) -> Result<()> {
        let mut state = self.record_mutation(
            SiteCall::RemoveResourceUnit(unit.id.clone()),
            StepKind::RemoveResourceUnit,
            &unit.id,
            logging_id,
        )?;
        let path = unit.config_path();
        let before = state.units.len();
        state.units.retain(|u| u.config_path() != path);
        if state.units.len() == before {
            bail!("item '{}' does not exist", path);
        }
        Ok(())
    }

    async fn remove_hosting_connection(
        &self,
        connection: &HostingConnection,
        logging_id: &OperationId,
    ) -> Result<()> {
        let mut state = self.record_mutation(
            SiteCall::RemoveHostingConnection(connection.name.clone()),
            StepKind::RemoveHostingConnection,
            &connection.name,
            logging_id,
        )?;
        let path = connection.config_path();
        let before = state.connections.len();
        state.connections.retain(|c| c.config_path() != path);
        if state.connections.len() == before {
            bail!("item '{}' does not exist", path);
        }
        Ok(())
    }

    async fn remove_broker_registration(
        &self,
        connection_name: &str,
        logging_id: &OperationId,
    ) -> Result<()> {
        let mut state = self.record_mutation(
            SiteCall::RemoveBrokerRegistration(connection_name.to_string()),
            StepKind::RemoveBrokerRegistration,
            connection_name,
            logging_id,
        )?;
        if !state.broker_registrations.remove(connection_name) {
            bail!("broker hypervisor connection '{}' not found", connection_name);
        }
        Ok(())
    }
}
