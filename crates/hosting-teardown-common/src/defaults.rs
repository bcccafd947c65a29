//! Default configuration values shared across hosting-teardown crates

/// Default administrative endpoint (the local delivery controller)
pub const DEFAULT_ADMIN_ADDRESS: &str = "localhost";

/// Default shell used to drive the administrative cmdlets
pub const DEFAULT_SHELL: &str = "pwsh";

/// Default per-call timeout in seconds for remote administrative calls
pub const DEFAULT_CALL_TIMEOUT: u64 = 300;

/// Source name recorded on audit operations
pub const AUDIT_SOURCE: &str = "hosting-teardown";

/// Closed ledger entries older than this are removed by `prune`
pub const LEDGER_RETENTION_DAYS: i64 = 30;

/// Environment variable overriding the administrative endpoint
pub const ADMIN_ADDRESS_ENV: &str = "HOSTING_TEARDOWN_ADMIN_ADDRESS";
