//! Ledger database setup and schema management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// Database connection pool type alias
pub type DbPool = SqlitePool;

/// Get the ledger database path
pub fn ledger_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "hosting-teardown")
        .context("Failed to get project directories")?;

    let state_dir = proj_dirs.data_local_dir();
    fs::create_dir_all(state_dir).context("Failed to create ledger directory")?;

    Ok(state_dir.join("ledger.db"))
}

/// Open the ledger at its default location, creating it if needed
pub async fn open_db() -> Result<DbPool> {
    let path = ledger_path()?;
    open_db_at(&path).await
}

/// Open a ledger at an explicit path, creating it if needed
pub async fn open_db_at(path: &Path) -> Result<DbPool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open ledger at {}", path.display()))?;

    setup_schema(&pool).await?;

    Ok(pool)
}

/// Setup database schema
pub(crate) async fn setup_schema(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            label TEXT NOT NULL,
            kind TEXT NOT NULL,
            targets TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            success INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_operations_run ON operations(run_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_operations_started ON operations(started_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// In-memory ledger with the schema applied
#[cfg(test)]
pub(crate) async fn open_test_db() -> Result<DbPool> {
    let pool = hosting_teardown_test_utils::db::open_test_db().await?;
    setup_schema(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_db_at_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let pool = open_db_at(&path).await.unwrap();
        assert!(path.exists());

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='operations'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn test_schema_setup_is_idempotent() {
        let pool = open_test_db().await.unwrap();
        setup_schema(&pool).await.unwrap();
    }
}
