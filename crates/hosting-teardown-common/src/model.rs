//! Site objects observed by the teardown
//!
//! These mirror the records the administrative API returns. The teardown
//! never creates any of them; it only lists them and asks for their removal.

use serde::{Deserialize, Serialize};

/// Configuration-store root for hosting connections
pub const CONNECTIONS_ROOT: &str = r"XDHyp:\Connections";

/// Configuration-store root for resource connections (hosting units)
pub const HOSTING_UNITS_ROOT: &str = r"XDHyp:\HostingUnits";

/// A hosting connection: the link between the site and a hypervisor platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
pub struct HostingConnection {
    /// Connection name, unique among listed connections
    #[garde(length(min = 1))]
    pub name: String,

    /// Platform-assigned identifier, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub uid: Option<String>,

    /// Configuration-store path; derived from the name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(inner(length(min = 1)))]
    pub path: Option<String>,
}

impl HostingConnection {
    /// Connection with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: None,
            path: None,
        }
    }

    /// Path used to remove the connection object
    pub fn config_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!(r"{}\{}", CONNECTIONS_ROOT, self.name))
    }
}

/// A resource connection (hosting unit) belonging to one hosting connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
pub struct ResourceUnit {
    /// Unique unit identifier
    #[garde(length(min = 1))]
    pub id: String,

    /// Display name
    #[garde(length(min = 1))]
    pub name: String,

    /// Name of the owning hosting connection
    #[garde(length(min = 1))]
    pub connection: String,

    /// Identifier provisioning tasks use to reference this unit; defaults to `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(inner(length(min = 1)))]
    pub link_id: Option<String>,

    /// Configuration-store path; derived from the name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(inner(length(min = 1)))]
    pub path: Option<String>,
}

impl ResourceUnit {
    /// Unit whose name and link id both equal `id`
    pub fn new(id: impl Into<String>, connection: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            connection: connection.into(),
            link_id: None,
            path: None,
        }
    }

    /// Identifier used to correlate with provisioning tasks
    pub fn task_link(&self) -> &str {
        self.link_id.as_deref().unwrap_or(&self.id)
    }

    /// Path used to remove the unit object
    pub fn config_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!(r"{}\{}", HOSTING_UNITS_ROOT, self.name))
    }
}

/// A long-running provisioning job bound to a resource unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
pub struct ProvisioningTask {
    /// Task identifier
    #[garde(length(min = 1))]
    pub id: String,

    /// Whether the task is still running
    #[garde(skip)]
    pub active: bool,

    /// Link id of the unit the task is bound to
    #[garde(length(min = 1))]
    pub resource_unit_id: String,

    /// Task type as reported by the task service (e.g. "NewProvisioningScheme")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub kind: Option<String>,
}

impl ProvisioningTask {
    /// Active task bound to `resource_unit_id`
    pub fn active(id: impl Into<String>, resource_unit_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
            resource_unit_id: resource_unit_id.into(),
            kind: None,
        }
    }
}
