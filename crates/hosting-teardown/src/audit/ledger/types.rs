//! Ledger record types

use chrono::{DateTime, Utc};
use hosting_teardown_common::StepKind;
use serde::Serialize;

/// A recorded high-level operation
#[derive(Debug, Clone, Serialize)]
pub struct LedgerOperation {
    pub id: String,
    pub run_id: String,
    pub label: String,
    pub kind: StepKind,
    pub targets: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// `None` while the operation is open
    pub success: Option<bool>,
}

impl LedgerOperation {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Short status for tables
    pub fn status(&self) -> &'static str {
        match self.success {
            None => "open",
            Some(true) => "succeeded",
            Some(false) => "failed",
        }
    }
}
