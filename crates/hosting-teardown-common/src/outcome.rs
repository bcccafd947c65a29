//! Outcome of a single destructive step

use serde::{Deserialize, Serialize};

/// How a destructive step ended
///
/// `Declined` is not a failure: the operator withheld confirmation (or the run
/// is a dry run), so no call was issued and nothing was audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(tag = "status", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepOutcome {
    /// The call was issued and succeeded
    Succeeded,
    /// The call was issued (or its audit bracket could not be opened) and failed
    Failed { reason: String },
    /// Confirmation was withheld; nothing happened
    Declined,
}

impl StepOutcome {
    /// Failed outcome from any displayable error
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        StepOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, StepOutcome::Declined)
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Failed { reason } => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_ref()),
        }
    }
}
