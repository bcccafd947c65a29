//! CLI operations for the ledger

use super::db::{DbPool, open_db};
use super::queries::recent_operations;
use super::types::LedgerOperation;
use anyhow::Result;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hosting_teardown_common::defaults::LEDGER_RETENTION_DAYS;

/// Render ledger operations as a table
pub fn operations_table(operations: &[LedgerOperation]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Started"),
            Cell::new("Run"),
            Cell::new("Kind"),
            Cell::new("Operation"),
            Cell::new("Status"),
        ]);

    for op in operations {
        table.add_row(vec![
            Cell::new(op.started_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(&op.run_id),
            Cell::new(op.kind.as_ref()),
            Cell::new(&op.label),
            Cell::new(op.status()),
        ]);
    }

    table
}

/// List recent ledger operations
pub async fn list_operations(limit: u32) -> Result<()> {
    let pool = open_db().await?;
    let operations = recent_operations(&pool, limit).await?;

    if operations.is_empty() {
        println!("No recorded operations");
        return Ok(());
    }

    println!("{}", operations_table(&operations));

    Ok(())
}

/// Delete closed operations older than the retention window
pub async fn prune_closed(pool: &DbPool, retention_days: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM operations
         WHERE ended_at IS NOT NULL
         AND datetime(ended_at) < datetime('now', ?)",
    )
    .bind(format!("-{retention_days} days"))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Remove old closed entries from the ledger
pub async fn prune_ledger() -> Result<()> {
    let pool = open_db().await?;
    let pruned = prune_closed(&pool, LEDGER_RETENTION_DAYS).await?;
    println!("Pruned {pruned} old operation records");
    Ok(())
}
