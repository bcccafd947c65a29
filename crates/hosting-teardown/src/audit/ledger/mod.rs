//! Local SQLite ledger of high-level operations
//!
//! Uses sqlx for async database access with a connection pool. One row per
//! operation; rows are inserted on open and updated once on close.

mod cli;
mod crud;
mod db;
mod queries;
mod types;

pub use cli::{list_operations, operations_table, prune_closed, prune_ledger};
pub use crud::{close_operation, insert_operation};
pub use db::{DbPool, ledger_path, open_db, open_db_at};
pub use queries::{open_operations, recent_operations, run_operations};
pub use types::LedgerOperation;

use super::{AuditLog, OperationId, OperationRequest};
use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

/// Audit log backed by the local ledger; one instance per run
#[derive(Debug, Clone)]
pub struct LedgerAuditLog {
    pool: DbPool,
    run_id: String,
}

impl LedgerAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            run_id: Uuid::now_v7().to_string(),
        }
    }

    /// Open the ledger at its default location
    pub async fn open_default() -> Result<Self> {
        Ok(Self::new(open_db().await?))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl AuditLog for LedgerAuditLog {
    async fn open(&self, request: &OperationRequest) -> Result<OperationId> {
        let id = Uuid::now_v7().to_string();
        insert_operation(&self.pool, &id, &self.run_id, request).await?;
        debug!(operation_id = %id, run_id = %self.run_id, kind = %request.kind, "Opened ledger operation");
        Ok(OperationId::new(id))
    }

    async fn close(&self, id: &OperationId, success: bool) -> Result<()> {
        close_operation(&self.pool, id.as_str(), success).await?;
        debug!(operation_id = %id, success, "Closed ledger operation");
        Ok(())
    }
}
