//! Destructive step kinds and teardown ordering
//!
//! Every mutating call the teardown issues is one of these kinds. The
//! teardown order mirrors the object dependencies in the site: tasks hold
//! references to resource units, units belong to a hosting connection, and
//! the broker registration mirrors the connection.

use serde::{Deserialize, Serialize};

/// Kinds of destructive steps performed during a teardown
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StepKind {
    /// Stop an active provisioning task
    StopTask,
    /// Remove a (stopped) provisioning task
    RemoveTask,
    /// Remove a resource connection (hosting unit)
    RemoveResourceUnit,
    /// Remove the hosting connection object from the configuration store
    RemoveHostingConnection,
    /// Remove the broker-side hypervisor connection registration
    RemoveBrokerRegistration,
}

impl StepKind {
    /// Teardown phase (lower runs first)
    ///
    /// - 0: Stop tasks
    /// - 1: Remove tasks
    /// - 2: Remove resource units
    /// - 3: Remove the hosting connection
    /// - 4: Remove the broker registration
    pub fn phase(self) -> u8 {
        match self {
            StepKind::StopTask => 0,
            StepKind::RemoveTask => 1,
            StepKind::RemoveResourceUnit => 2,
            StepKind::RemoveHostingConnection => 3,
            StepKind::RemoveBrokerRegistration => 4,
        }
    }

    /// Human-readable action, used for confirmation prompts and audit labels
    pub fn action(self) -> &'static str {
        match self {
            StepKind::StopTask => "Stop provisioning task",
            StepKind::RemoveTask => "Remove provisioning task",
            StepKind::RemoveResourceUnit => "Remove resource connection",
            StepKind::RemoveHostingConnection => "Remove hosting connection",
            StepKind::RemoveBrokerRegistration => "Remove broker hypervisor connection",
        }
    }

    /// Object type recorded as the audit target type
    pub fn target_type(self) -> &'static str {
        match self {
            StepKind::StopTask | StepKind::RemoveTask => "ProvTask",
            StepKind::RemoveResourceUnit => "HostingUnit",
            StepKind::RemoveHostingConnection => "HypervisorConnection",
            StepKind::RemoveBrokerRegistration => "BrokerHypervisorConnection",
        }
    }

    /// Whether the step only ever runs when the whole connection is torn down
    pub fn removes_parent(self) -> bool {
        matches!(
            self,
            StepKind::RemoveHostingConnection | StepKind::RemoveBrokerRegistration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tasks_drain_before_units() {
        assert!(StepKind::StopTask.phase() < StepKind::RemoveTask.phase());
        assert!(
            StepKind::RemoveTask.phase() < StepKind::RemoveResourceUnit.phase(),
            "Tasks must be removed before the units they reference"
        );
    }

    #[test]
    fn test_units_before_parent() {
        assert!(
            StepKind::RemoveResourceUnit.phase() < StepKind::RemoveHostingConnection.phase(),
            "Units must be removed before their hosting connection"
        );
        assert!(
            StepKind::RemoveHostingConnection.phase()
                < StepKind::RemoveBrokerRegistration.phase()
        );
    }

    #[test]
    fn test_phases_are_unique() {
        let phases: HashSet<u8> = StepKind::iter().map(StepKind::phase).collect();
        assert_eq!(phases.len(), StepKind::iter().count());
    }

    #[test]
    fn test_kebab_case_round_trip_names() {
        assert_eq!(StepKind::StopTask.to_string(), "stop-task");
        assert_eq!(
            StepKind::RemoveBrokerRegistration.as_ref(),
            "remove-broker-registration"
        );
        assert_eq!(
            StepKind::from_str("remove-resource-unit").unwrap(),
            StepKind::RemoveResourceUnit
        );
        assert!(StepKind::from_str("delete-everything").is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        for kind in StepKind::iter() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_parent_steps() {
        let parents: Vec<_> = StepKind::iter().filter(|k| k.removes_parent()).collect();
        assert_eq!(
            parents,
            vec![
                StepKind::RemoveHostingConnection,
                StepKind::RemoveBrokerRegistration
            ]
        );
    }
}
