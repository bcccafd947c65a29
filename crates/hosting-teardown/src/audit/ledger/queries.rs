//! Read operations for the ledger

use super::db::DbPool;
use super::types::LedgerOperation;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hosting_teardown_common::StepKind;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;

const COLUMNS: &str = "id, run_id, label, kind, targets, started_at, ended_at, success";

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp '{value}'"))?
        .with_timezone(&Utc))
}

fn from_row(row: &SqliteRow) -> Result<LedgerOperation> {
    let kind: String = row.get("kind");
    let targets: String = row.get("targets");
    let started_at: String = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");

    Ok(LedgerOperation {
        id: row.get("id"),
        run_id: row.get("run_id"),
        label: row.get("label"),
        kind: StepKind::from_str(&kind).with_context(|| format!("Unknown step kind '{kind}'"))?,
        targets: serde_json::from_str(&targets).context("Invalid targets column")?,
        started_at: parse_timestamp(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
        success: row.get("success"),
    })
}

/// Most recent operations, newest first
pub async fn recent_operations(pool: &DbPool, limit: u32) -> Result<Vec<LedgerOperation>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM operations ORDER BY started_at DESC, rowid DESC LIMIT ?"
    ))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Operations of one run, in the order they were opened
pub async fn run_operations(pool: &DbPool, run_id: &str) -> Result<Vec<LedgerOperation>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM operations WHERE run_id = ? ORDER BY rowid"
    ))
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Operations that were opened but never closed
pub async fn open_operations(pool: &DbPool) -> Result<Vec<LedgerOperation>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM operations WHERE ended_at IS NULL ORDER BY rowid"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}
