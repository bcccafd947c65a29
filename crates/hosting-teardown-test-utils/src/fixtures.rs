//! Site scenarios for tests
//!
//! A [`Fixture`] serializes to the same JSON shape `--snapshot` accepts, so
//! the same scenario can seed an in-memory site directly or through a file.

use anyhow::Result;
use hosting_teardown_common::{HostingConnection, ProvisioningTask, ResourceUnit};
use serde::Serialize;
use std::io::Write;
use tempfile::NamedTempFile;

/// A site scenario
#[derive(Debug, Clone, Default, Serialize)]
pub struct Fixture {
    pub connections: Vec<HostingConnection>,
    pub units: Vec<ResourceUnit>,
    pub tasks: Vec<ProvisioningTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_registrations: Option<Vec<String>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(mut self, name: &str) -> Self {
        self.connections.push(HostingConnection::named(name));
        self
    }

    pub fn unit(mut self, id: &str, connection: &str) -> Self {
        self.units.push(ResourceUnit::new(id, connection));
        self
    }

    pub fn active_task(mut self, id: &str, unit_id: &str) -> Self {
        self.tasks.push(ProvisioningTask::active(id, unit_id));
        self
    }

    /// Connection HV1 with unit RU1 running task T1
    pub fn single_task() -> Self {
        Self::new()
            .connection("HV1")
            .unit("RU1", "HV1")
            .active_task("T1", "RU1")
    }

    /// Connection HV1 with RU1 (running T1) and an idle RU2
    pub fn two_units_one_task() -> Self {
        Self::single_task().unit("RU2", "HV1")
    }

    /// Connection HV1 with unit RU1 and `n` queued active tasks `T0..Tn`
    pub fn queued_tasks(n: usize) -> Self {
        (0..n).fold(
            Self::new().connection("HV1").unit("RU1", "HV1"),
            |fixture, i| fixture.active_task(&format!("T{i}"), "RU1"),
        )
    }

    /// Two connections; only HV2 has provisioning work
    pub fn two_connections() -> Self {
        Self::new()
            .connection("HV1")
            .unit("RU1", "HV1")
            .connection("HV2")
            .unit("RU2", "HV2")
            .active_task("T2", "RU2")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the scenario to a temporary snapshot file
    pub fn write_snapshot(&self) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("site-")
            .suffix(".json")
            .tempfile()?;
        file.write_all(self.to_json()?.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}
