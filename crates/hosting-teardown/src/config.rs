//! Configuration types for a teardown run

use hosting_teardown_common::defaults::{DEFAULT_ADMIN_ADDRESS, DEFAULT_CALL_TIMEOUT, DEFAULT_SHELL};
use std::path::PathBuf;
use std::time::Duration;

/// Knobs of the teardown protocol itself
#[derive(Debug, Clone, Default)]
pub struct TeardownConfig {
    /// Remove only the resource unit that had the active task, keeping the
    /// hosting connection and its broker registration
    pub resource_only: bool,
    /// Optional cap on stop+remove iterations of the drain loop. Reaching it
    /// ends the run before any removal; unbounded by default.
    pub max_drain_iterations: Option<u32>,
}

impl TeardownConfig {
    pub fn resource_only() -> Self {
        Self {
            resource_only: true,
            ..Default::default()
        }
    }
}

/// How the administrative endpoint is reached
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Delivery controller address passed as `-AdminAddress`
    pub admin_address: String,
    /// PowerShell executable
    pub shell: String,
    /// Bound on every remote call
    pub call_timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            admin_address: DEFAULT_ADMIN_ADDRESS.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT),
        }
    }
}

/// How destructive steps are confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConfirmMode {
    /// Ask on the console for every step
    #[default]
    Prompt,
    /// Proceed with every step without asking
    Yes,
    /// Print what would happen; never mutate
    DryRun,
}

/// Where high-level operations are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuditSink {
    /// The site's own configuration log
    #[default]
    Site,
    /// The local SQLite ledger
    Ledger,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Runtime behavior flags
#[derive(Debug, Clone, Default)]
pub struct RuntimeFlags {
    pub confirm: ConfirmMode,
    pub audit: AuditSink,
    pub output: OutputFormat,
    /// Rehearse against a JSON site snapshot instead of the live site
    pub snapshot: Option<PathBuf>,
    /// Connection chosen up front; prompts when absent
    pub connection: Option<String>,
}

/// Configuration for one invocation of `teardown`
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub teardown: TeardownConfig,
    pub adapter: AdapterConfig,
    pub flags: RuntimeFlags,
}

impl RunConfig {
    pub fn is_dry_run(&self) -> bool {
        self.flags.confirm == ConfirmMode::DryRun
    }

    pub fn is_rehearsal(&self) -> bool {
        self.flags.snapshot.is_some()
    }
}
