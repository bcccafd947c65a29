//! SQLite helpers for ledger tests
//!
//! The ledger schema lives in the main crate; these helpers only hand out
//! empty databases for it to set up.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempDir;

/// Fresh in-memory database without a schema.
///
/// Pinned to one connection: every connection to `sqlite::memory:` would
/// otherwise see its own empty database.
///
/// ```ignore
/// let pool = hosting_teardown_test_utils::db::open_test_db().await?;
/// setup_schema(&pool).await?;
/// ```
pub async fn open_test_db() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// A ledger file location inside a directory removed on drop
pub struct TempLedger {
    dir: TempDir,
}

impl TempLedger {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("ledger-").tempdir()?,
        })
    }

    /// Path of the ledger database; the file is created by whoever opens it
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("ledger.db")
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_db_keeps_state_across_queries() {
        let pool = open_test_db().await.unwrap();

        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (id) VALUES (1), (2)")
            .execute(&pool)
            .await
            .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 2);
    }

    #[test]
    fn test_temp_ledger_path_is_not_created() {
        let ledger = TempLedger::new().unwrap();
        assert!(ledger.dir().is_dir());
        assert!(!ledger.path().exists());

        let dir = ledger.dir().to_path_buf();
        drop(ledger);
        assert!(!dir.exists());
    }
}
