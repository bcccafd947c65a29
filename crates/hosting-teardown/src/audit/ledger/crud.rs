//! Write operations for the ledger

use super::db::DbPool;
use crate::audit::OperationRequest;
use anyhow::{Result, bail};
use chrono::Utc;

/// Insert a newly opened operation
pub async fn insert_operation(
    pool: &DbPool,
    id: &str,
    run_id: &str,
    request: &OperationRequest,
) -> Result<()> {
    let targets_json = serde_json::to_string(&request.targets)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO operations (id, run_id, label, kind, targets, started_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(run_id)
    .bind(&request.label)
    .bind(request.kind.as_ref())
    .bind(&targets_json)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Close an open operation with its terminal status.
///
/// Fails when the operation does not exist or is already closed.
pub async fn close_operation(pool: &DbPool, id: &str, success: bool) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "UPDATE operations SET ended_at = ?, success = ?
         WHERE id = ? AND ended_at IS NULL",
    )
    .bind(&now)
    .bind(success)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("No open ledger operation with id {}", id);
    }

    Ok(())
}
