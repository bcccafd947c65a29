//! Site collaborators
//!
//! The teardown talks to the site through three narrow traits:
//! - [`DirectoryService`]: enumerate hosting connections and resource units
//! - [`TaskService`]: find, stop and remove provisioning tasks
//! - [`RemovalService`]: delete configuration objects and broker registrations
//!
//! Two implementations are provided:
//! - [`PowerShellSite`]: drives the site's administrative cmdlets
//! - [`InMemorySite`]: in-process site for tests and offline rehearsals

pub mod client;
pub mod memory;
pub mod powershell;

pub use client::PowerShellSite;
pub use memory::{InMemorySite, SiteCall, SiteSnapshot};
pub use powershell::PowerShell;

use crate::audit::OperationId;
use anyhow::Result;
use hosting_teardown_common::{HostingConnection, ProvisioningTask, ResourceUnit};
use std::future::Future;

/// Enumerates site objects.
pub trait DirectoryService: Send + Sync {
    /// List all hosting connections; an empty list is not an error
    fn list_hosting_connections(
        &self,
    ) -> impl Future<Output = Result<Vec<HostingConnection>>> + Send;

    /// List the resource units owned by a hosting connection
    fn list_resource_units(
        &self,
        connection: &str,
    ) -> impl Future<Output = Result<Vec<ResourceUnit>>> + Send;
}

/// Provisioning task operations.
///
/// `find_active_task` returns at most one task with `active == true`, even
/// when several exist. The task service does not distinguish a stale task
/// from a current one, and the surfaced task is not guaranteed to be bound to
/// `resource_unit_id`; callers must treat the result as "the active task the
/// site chose to report".
pub trait TaskService: Send + Sync {
    /// Find the active task for a resource unit's link id
    fn find_active_task(
        &self,
        resource_unit_id: &str,
    ) -> impl Future<Output = Result<Option<ProvisioningTask>>> + Send;

    /// Stop a running task
    fn stop_task(
        &self,
        task_id: &str,
        logging_id: &OperationId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a task record
    fn remove_task(
        &self,
        task_id: &str,
        logging_id: &OperationId,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Destructive object removal.
///
/// Like the task mutations, every removal carries the id of the high-level
/// operation bracketing it so the site can link its low-level log entries.
pub trait RemovalService: Send + Sync {
    /// Remove a resource unit by its configuration-store path
    fn remove_resource_unit(
        &self,
        unit: &ResourceUnit,
        logging_id: &OperationId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a hosting connection by its configuration-store path
    fn remove_hosting_connection(
        &self,
        connection: &HostingConnection,
        logging_id: &OperationId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove the broker-side hypervisor connection registration by name
    fn remove_broker_registration(
        &self,
        connection_name: &str,
        logging_id: &OperationId,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Everything the teardown needs from a site.
pub trait SiteOperations: DirectoryService + TaskService + RemovalService {}

impl<T: DirectoryService + TaskService + RemovalService> SiteOperations for T {}
