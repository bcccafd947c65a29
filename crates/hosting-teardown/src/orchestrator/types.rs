//! Core types for the orchestrator
//!
//! Contains the per-step record and the run report returned by
//! [`super::TeardownOrchestrator::run`].

use crate::audit::OperationId;
use crate::error::TeardownError;
use hosting_teardown_common::{ProvisioningTask, StepKind, StepOutcome};
use serde::Serialize;

/// An active task surfaced by a scan, with the unit whose query surfaced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTask {
    pub task: ProvisioningTask,
    /// Id of the unit that was queried (not necessarily the task's own unit)
    pub unit_id: String,
}

/// One destructive step as it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub kind: StepKind,
    /// Task id, unit id or connection name
    pub target: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    /// Audit operation that bracketed the call, if one was opened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationId>,
}

impl StepRecord {
    /// The step as a typed error, for failed and declined steps
    pub fn error(&self) -> Option<TeardownError> {
        match &self.outcome {
            StepOutcome::Succeeded => None,
            StepOutcome::Failed { reason } => Some(TeardownError::StepFailed {
                kind: self.kind,
                target: self.target.clone(),
                reason: reason.clone(),
            }),
            StepOutcome::Declined => Some(TeardownError::Declined {
                kind: self.kind,
                target: self.target.clone(),
            }),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Disposition {
    /// The initial scan found nothing to drain; no step was attempted
    NoActiveTask,
    /// Every phase ran; individual steps may still have failed or been declined
    Completed,
    /// The drain hit its iteration cap with tasks still active; nothing was removed
    DrainTruncated,
}

/// Result of one teardown run
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub connection: String,
    pub resource_only: bool,
    pub disposition: Disposition,
    /// Unit whose query surfaced the first active task
    pub saved_unit_id: Option<String>,
    pub steps: Vec<StepRecord>,
}

impl TeardownReport {
    pub(crate) fn new(connection: &str, resource_only: bool) -> Self {
        Self {
            connection: connection.to_string(),
            resource_only,
            disposition: Disposition::NoActiveTask,
            saved_unit_id: None,
            steps: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_failure()).count()
    }

    pub fn declined(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_declined()).count()
    }

    /// Steps of one kind
    pub fn steps_of(&self, kind: StepKind) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(move |s| s.kind == kind)
    }

    /// One-line summary for the operator
    pub fn summary(&self) -> String {
        let counts = format!(
            "{} steps: {} succeeded, {} failed, {} declined",
            self.steps.len(),
            self.succeeded(),
            self.failed(),
            self.declined()
        );
        match self.disposition {
            Disposition::NoActiveTask => "no active tasks found".to_string(),
            Disposition::Completed => counts,
            Disposition::DrainTruncated => {
                format!("drain cap reached with active tasks left, nothing removed; {counts}")
            }
        }
    }
}
