//! PowerShell script host
//!
//! Runs administrative scripts through `pwsh -NoProfile -NonInteractive
//! -Command`, with the site snap-ins loaded and errors made terminating.
//! Every invocation is bounded by the configured call timeout; a call that
//! exceeds it is killed.

use crate::config::AdapterConfig;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Script prelude shared by every call
const PRELUDE: &str = "$ErrorActionPreference = 'Stop'; \
$ProgressPreference = 'SilentlyContinue'; \
Add-PSSnapin Citrix* -ErrorAction SilentlyContinue;";

/// Quote a value as a PowerShell single-quoted string literal
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Wrap a pipeline so its output is always a JSON array
pub fn as_json_array(pipeline: &str) -> String {
    format!("ConvertTo-Json -Compress -Depth 4 -InputObject @({pipeline})")
}

/// Parse `ConvertTo-Json` output into records.
///
/// Accepts an array, a single object (older hosts unwrap one-element arrays)
/// or empty output.
pub fn parse_records<T: DeserializeOwned>(output: &str) -> Result<Vec<T>> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).context("Cmdlet output is not valid JSON")?;
    let records = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    records
        .into_iter()
        .map(|v| serde_json::from_value(v).context("Unexpected record shape in cmdlet output"))
        .collect()
}

/// Script host bound to one administrative endpoint
#[derive(Debug, Clone)]
pub struct PowerShell {
    program: String,
    admin_address: String,
    timeout: Duration,
}

impl PowerShell {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            program: config.shell.clone(),
            admin_address: config.admin_address.clone(),
            timeout: config.call_timeout,
        }
    }

    /// Administrative endpoint, quoted for use as `-AdminAddress`
    pub fn admin_address(&self) -> String {
        quote(&self.admin_address)
    }

    /// Full script text for a body: prelude, endpoint binding, body
    pub fn script(&self, body: &str) -> String {
        format!(
            "{PRELUDE} Set-HypAdminConnection -AdminAddress {}; {body}",
            self.admin_address()
        )
    }

    fn command(&self, body: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(self.script(body))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run a script body and return its standard output
    pub async fn run(&self, name: &str, body: &str) -> Result<String> {
        debug!(
            cmdlet = %name,
            admin_address = %self.admin_address,
            timeout_secs = self.timeout.as_secs(),
            "Running cmdlet"
        );

        let child = self
            .command(body)
            .spawn()
            .with_context(|| format!("Failed to launch {} for {}", self.program, name))?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.with_context(|| format!("Failed waiting for {name}"))?,
            Err(_) => {
                warn!(
                    cmdlet = %name,
                    timeout_secs = self.timeout.as_secs(),
                    "Cmdlet timed out, killing process"
                );
                anyhow::bail!("{} timed out after {}s", name, self.timeout.as_secs());
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} failed with {}: {}",
                name,
                output.status,
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout).with_context(|| format!("{name} output is not UTF-8"))
    }

    /// Run a pipeline and parse its output as JSON records
    pub async fn query<T: DeserializeOwned>(&self, name: &str, pipeline: &str) -> Result<Vec<T>> {
        let output = self.run(name, &as_json_array(pipeline)).await?;
        parse_records(&output).with_context(|| format!("Failed to parse {name} output"))
    }
}
