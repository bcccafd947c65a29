//! hosting-teardown: drain provisioning tasks and tear down a hosting connection
//!
//! Lists the site's hosting connections, lets the operator pick one, then
//! stops and removes its active provisioning tasks before removing its
//! resource connections, the connection itself and its broker registration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hosting_teardown::audit::{self, AuditLog, LedgerAuditLog, MemoryAuditLog};
use hosting_teardown::config::{
    AdapterConfig, AuditSink, ConfirmMode, OutputFormat, RunConfig, RuntimeFlags, TeardownConfig,
};
use hosting_teardown::confirm::{
    AlwaysGate, ConfirmationGate, ConsoleGate, DryRunGate, choose_connection,
};
use hosting_teardown::site::{DirectoryService, InMemorySite, PowerShellSite, SiteOperations};
use hosting_teardown::{TeardownError, report, run_teardown};
use hosting_teardown_common::defaults::{
    ADMIN_ADDRESS_ENV, DEFAULT_ADMIN_ADDRESS, DEFAULT_CALL_TIMEOUT, DEFAULT_SHELL,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hosting-teardown")]
#[command(about = "Drain provisioning tasks and tear down a hosting connection")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// How to reach the site
#[derive(clap::Args, Debug)]
struct SiteArgs {
    /// Delivery controller address
    #[arg(long, env = ADMIN_ADDRESS_ENV, default_value = DEFAULT_ADMIN_ADDRESS)]
    admin_address: String,

    /// Work against a JSON site snapshot instead of the live site
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Timeout in seconds for each administrative call
    #[arg(long, default_value_t = DEFAULT_CALL_TIMEOUT)]
    call_timeout: u64,

    /// PowerShell executable
    #[arg(long, default_value = DEFAULT_SHELL)]
    shell: String,
}

impl From<&SiteArgs> for AdapterConfig {
    fn from(args: &SiteArgs) -> Self {
        Self {
            admin_address: args.admin_address.clone(),
            shell: args.shell.clone(),
            call_timeout: Duration::from_secs(args.call_timeout),
        }
    }
}

/// Arguments for the teardown command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct TeardownArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Hosting connection to tear down (prompts when omitted)
    #[arg(short, long)]
    connection: Option<String>,

    /// Remove only the resource connection that had the active task; keep
    /// the hosting connection and its broker registration
    #[arg(long)]
    resource_only: bool,

    /// Print what would be done without changing anything
    #[arg(long, conflicts_with = "yes")]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Where to record high-level operations
    #[arg(long, value_enum, default_value_t = AuditSink::Site)]
    audit: AuditSink,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Stop draining after this many stop+remove iterations; when reached,
    /// nothing is removed. Unbounded when omitted
    #[arg(long)]
    max_drain_iterations: Option<u32>,
}

impl From<TeardownArgs> for RunConfig {
    fn from(args: TeardownArgs) -> Self {
        let confirm = if args.dry_run {
            ConfirmMode::DryRun
        } else if args.yes {
            ConfirmMode::Yes
        } else {
            ConfirmMode::Prompt
        };

        Self {
            teardown: TeardownConfig {
                resource_only: args.resource_only,
                max_drain_iterations: args.max_drain_iterations,
            },
            adapter: AdapterConfig::from(&args.site),
            flags: RuntimeFlags {
                confirm,
                audit: args.audit,
                output: args.output,
                snapshot: args.site.snapshot,
                connection: args.connection,
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drain active tasks and remove a hosting connection.
    ///
    /// The task service reports at most one active task per query and does
    /// not guarantee it belongs to the chosen connection; run this only when
    /// no other connection has provisioning work in flight.
    ///
    /// Exits with status 2 when the chosen connection is not listed or has no
    /// resource connections, and 1 when the site cannot be reached.
    Teardown(Box<TeardownArgs>),

    /// List hosting connections and their resource units
    List {
        #[command(flatten)]
        site: SiteArgs,
    },

    /// Show operations recorded in the local ledger
    History {
        /// Number of operations to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Remove old closed operations from the local ledger
    Prune,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match e.downcast_ref::<TeardownError>() {
            Some(err) if err.is_not_found() => {
                eprintln!("{err}");
                std::process::exit(2);
            }
            _ => {
                print_error(&e);
                std::process::exit(1);
            }
        }
    }
}

/// Print the error and each of its causes, indented by depth
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();
    let mut chain = e.chain();
    if let Some(top) = chain.next() {
        let _ = writeln!(stderr, "\x1b[1;31merror:\x1b[0m {top}");
    }
    for (depth, cause) in chain.enumerate() {
        let _ = writeln!(stderr, "{:width$}\x1b[33m->\x1b[0m {cause}", "", width = 2 * (depth + 1));
    }

    let backtrace = e.backtrace();
    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
        let _ = writeln!(stderr, "\n{backtrace}");
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Teardown(teardown_args) => {
            let config: RunConfig = (*teardown_args).into();
            handle_teardown(config).await?;
        }
        Command::List { site } => handle_list(&site).await?,
        Command::History { limit } => audit::ledger::list_operations(limit).await?,
        Command::Prune => audit::ledger::prune_ledger().await?,
    }

    Ok(())
}

/// Connect to the live site and check that the controller answers
async fn connect(adapter: &AdapterConfig) -> Result<PowerShellSite> {
    let site = PowerShellSite::new(adapter);
    site.check_reachable()
        .await
        .map_err(|e| TeardownError::unavailable("Get-BrokerSite", e))?;
    info!(admin_address = %adapter.admin_address, "Connected to delivery controller");
    Ok(site)
}

/// Handle the teardown command
async fn handle_teardown(config: RunConfig) -> Result<()> {
    info!(
        admin_address = %config.adapter.admin_address,
        resource_only = config.teardown.resource_only,
        dry_run = config.is_dry_run(),
        rehearsal = config.is_rehearsal(),
        audit = %config.flags.audit,
        "Starting teardown"
    );

    match (&config.flags.snapshot, config.flags.audit) {
        (Some(path), sink) => {
            let site = InMemorySite::load(path)
                .with_context(|| format!("Failed to load site snapshot {}", path.display()))?;
            info!(snapshot = %path.display(), "Rehearsing against site snapshot");

            match sink {
                AuditSink::Ledger => {
                    let audit = LedgerAuditLog::open_default().await?;
                    teardown_with(&site, &audit, &config).await?;
                }
                AuditSink::Site => {
                    let audit = MemoryAuditLog::new();
                    teardown_with(&site, &audit, &config).await?;
                    info!(operations = audit.open_count(), "Rehearsal audit operations recorded");
                }
            }
            info!(
                connections = ?site.connection_names(),
                units = ?site.unit_ids(),
                "Snapshot state after rehearsal"
            );
        }
        (None, AuditSink::Site) => {
            let site = connect(&config.adapter).await?;
            teardown_with(&site, &site, &config).await?;
        }
        (None, AuditSink::Ledger) => {
            let site = connect(&config.adapter).await?;
            let audit = LedgerAuditLog::open_default().await?;
            info!(run_id = %audit.run_id(), "Recording operations in local ledger");
            teardown_with(&site, &audit, &config).await?;
        }
    }

    Ok(())
}

/// Gate for the chosen confirmation mode
///
/// The console gate locks stdin; build it only after the connection prompt.
fn make_gate(mode: ConfirmMode) -> Box<dyn ConfirmationGate> {
    match mode {
        ConfirmMode::Prompt => Box::new(ConsoleGate::new(
            std::io::stdin().lock(),
            std::io::stderr(),
        )),
        ConfirmMode::Yes => Box::new(AlwaysGate(true)),
        ConfirmMode::DryRun => Box::new(DryRunGate::new(std::io::stderr())),
    }
}

/// Pick the connection and run the teardown against one site/audit pair
async fn teardown_with<S, A>(site: &S, audit: &A, config: &RunConfig) -> Result<()>
where
    S: SiteOperations,
    A: AuditLog,
{
    let connections = site
        .list_hosting_connections()
        .await
        .map_err(|e| TeardownError::unavailable("ListHostingConnections", e))?;

    if connections.is_empty() {
        println!("No hosting connections found");
        return Ok(());
    }

    let name = match &config.flags.connection {
        Some(name) => name.clone(),
        None => {
            let stdin = std::io::stdin();
            match choose_connection(stdin.lock(), std::io::stderr(), &connections)? {
                Some(name) => name,
                None => {
                    println!("No hosting connection chosen");
                    return Ok(());
                }
            }
        }
    };

    let mut gate = make_gate(config.flags.confirm);
    let report = run_teardown(site, audit, gate.as_mut(), config.teardown.clone(), &name).await?;

    match config.flags.output {
        OutputFormat::Text => print!("{}", report::render_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// Handle the list command
async fn handle_list(args: &SiteArgs) -> Result<()> {
    match &args.snapshot {
        Some(path) => {
            let site = InMemorySite::load(path)
                .with_context(|| format!("Failed to load site snapshot {}", path.display()))?;
            list_with(&site).await
        }
        None => {
            let site = connect(&AdapterConfig::from(args)).await?;
            list_with(&site).await
        }
    }
}

async fn list_with<S: DirectoryService>(site: &S) -> Result<()> {
    let connections = site
        .list_hosting_connections()
        .await
        .map_err(|e| TeardownError::unavailable("ListHostingConnections", e))?;

    if connections.is_empty() {
        println!("No hosting connections found");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(connections.len());
    for conn in connections {
        let units = site
            .list_resource_units(&conn.name)
            .await
            .map_err(|e| TeardownError::unavailable("ListResourceUnits", e))?;
        rows.push((conn, units));
    }

    println!("{}", report::connections_table(&rows));
    Ok(())
}
