//! Confirmation gates for destructive steps
//!
//! The orchestrator asks a [`ConfirmationGate`] before every destructive
//! call. A `false` answer skips that step only.

use anyhow::{Context, Result};
use hosting_teardown_common::HostingConnection;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use tracing::warn;

/// Decides whether a destructive step may proceed
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationGate {
    /// Ask whether `action` may be performed on `subject`
    fn confirm(&mut self, subject: &str, action: &str) -> bool;
}

/// Latched answer after "Yes to All" or "No to All"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    YesToAll,
    NoToAll,
}

/// Interactive gate: prompts on `writer`, reads answers from `reader`.
///
/// Empty input means No. End of input means No for this and every later step.
pub struct ConsoleGate<R, W> {
    reader: R,
    writer: W,
    latch: Option<Latch>,
}

impl<R: BufRead, W: Write> ConsoleGate<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            latch: None,
        }
    }

    fn prompt(&mut self, subject: &str, action: &str) -> std::io::Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "Confirm")?;
        writeln!(self.writer, "Are you sure you want to perform this action?")?;
        writeln!(
            self.writer,
            "Performing the operation \"{action}\" on target \"{subject}\"."
        )?;
        write!(
            self.writer,
            "[Y] Yes  [A] Yes to All  [N] No  [L] No to All  (default is \"N\"): "
        )?;
        self.writer.flush()
    }

    fn ask(&mut self, subject: &str, action: &str) -> std::io::Result<bool> {
        loop {
            self.prompt(subject, action)?;

            let mut input = String::new();
            if self.reader.read_line(&mut input)? == 0 {
                writeln!(self.writer)?;
                self.latch = Some(Latch::NoToAll);
                return Ok(false);
            }

            match input.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "a" | "yes to all" => {
                    self.latch = Some(Latch::YesToAll);
                    return Ok(true);
                }
                "" | "n" | "no" => return Ok(false),
                "l" | "no to all" => {
                    self.latch = Some(Latch::NoToAll);
                    return Ok(false);
                }
                other => writeln!(self.writer, "Unrecognized answer '{other}'")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ConfirmationGate for ConsoleGate<R, W> {
    fn confirm(&mut self, subject: &str, action: &str) -> bool {
        match self.latch {
            Some(Latch::YesToAll) => return true,
            Some(Latch::NoToAll) => return false,
            None => {}
        }

        self.ask(subject, action).unwrap_or_else(|e| {
            warn!(error = %e, "Confirmation prompt failed, treating as No");
            false
        })
    }
}

/// Never grants; describes what would have happened instead
pub struct DryRunGate<W> {
    writer: W,
}

impl<W: Write> DryRunGate<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ConfirmationGate for DryRunGate<W> {
    fn confirm(&mut self, subject: &str, action: &str) -> bool {
        if let Err(e) = writeln!(
            self.writer,
            "What if: Performing the operation \"{action}\" on target \"{subject}\"."
        ) {
            warn!(error = %e, "Failed to write dry-run line");
        }
        false
    }
}

/// Fixed answer for every step
#[derive(Debug, Clone, Copy)]
pub struct AlwaysGate(pub bool);

impl ConfirmationGate for AlwaysGate {
    fn confirm(&mut self, _subject: &str, _action: &str) -> bool {
        self.0
    }
}

/// Answers from a queue, then a fallback; records every question
#[derive(Debug, Clone, Default)]
pub struct ScriptedGate {
    answers: VecDeque<bool>,
    fallback: bool,
    asked: Vec<(String, String)>,
}

impl ScriptedGate {
    pub fn new(answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            fallback,
            asked: Vec::new(),
        }
    }

    /// `(subject, action)` pairs in the order they were asked
    pub fn asked(&self) -> &[(String, String)] {
        &self.asked
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&mut self, subject: &str, action: &str) -> bool {
        self.asked.push((subject.to_string(), action.to_string()));
        self.answers.pop_front().unwrap_or(self.fallback)
    }
}

/// Print the available hosting connections and read the operator's choice.
///
/// Returns `None` on empty input or end of input. The name is returned as
/// typed; it is matched exactly against the listing later.
pub fn choose_connection<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    connections: &[HostingConnection],
) -> Result<Option<String>> {
    writeln!(writer, "Hosting connections:")?;
    for conn in connections {
        writeln!(writer, "  {}", conn.name)?;
    }
    write!(writer, "Hosting connection to tear down: ")?;
    writer.flush()?;

    let mut input = String::new();
    reader
        .read_line(&mut input)
        .context("Failed to read hosting connection name")?;

    let name = input.trim();
    Ok((!name.is_empty()).then(|| name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> ConsoleGate<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleGate::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_console_yes_and_no() {
        let mut gate = console("y\nn\n\n");
        assert!(gate.confirm("T1", "Stop provisioning task"));
        assert!(!gate.confirm("T1", "Remove provisioning task"));
        // Empty answer takes the default
        assert!(!gate.confirm("RU1", "Remove resource connection"));

        let out = String::from_utf8(gate.writer.clone()).unwrap();
        assert!(out.contains("Performing the operation \"Stop provisioning task\" on target \"T1\"."));
        assert!(out.contains("[Y] Yes  [A] Yes to All  [N] No  [L] No to All  (default is \"N\")"));
    }

    #[test]
    fn test_console_yes_to_all_latches() {
        let mut gate = console("a\n");
        assert!(gate.confirm("T1", "Stop provisioning task"));
        assert!(gate.confirm("T1", "Remove provisioning task"));
        assert!(gate.confirm("HV1", "Remove hosting connection"));

        let out = String::from_utf8(gate.writer.clone()).unwrap();
        assert_eq!(out.matches("Confirm").count(), 1);
    }

    #[test]
    fn test_console_no_to_all_latches() {
        let mut gate = console("L\ny\n");
        assert!(!gate.confirm("T1", "Stop provisioning task"));
        assert!(!gate.confirm("T1", "Remove provisioning task"));
    }

    #[test]
    fn test_console_reprompts_on_garbage() {
        let mut gate = console("maybe\nyes\n");
        assert!(gate.confirm("T1", "Stop provisioning task"));
        let out = String::from_utf8(gate.writer.clone()).unwrap();
        assert!(out.contains("Unrecognized answer 'maybe'"));
        assert_eq!(out.matches("Confirm").count(), 2);
    }

    #[test]
    fn test_console_eof_declines_everything() {
        let mut gate = console("");
        assert!(!gate.confirm("T1", "Stop provisioning task"));
        assert!(!gate.confirm("T1", "Remove provisioning task"));
    }

    #[test]
    fn test_dry_run_gate_never_grants() {
        let mut out = Vec::new();
        {
            let mut gate = DryRunGate::new(&mut out);
            assert!(!gate.confirm("HV1", "Remove hosting connection"));
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "What if: Performing the operation \"Remove hosting connection\" on target \"HV1\".\n"
        );
    }

    #[test]
    fn test_scripted_gate_then_fallback() {
        let mut gate = ScriptedGate::new([true, false], true);
        assert!(gate.confirm("T1", "Stop provisioning task"));
        assert!(!gate.confirm("T1", "Remove provisioning task"));
        assert!(gate.confirm("RU1", "Remove resource connection"));
        assert_eq!(gate.asked().len(), 3);
        assert_eq!(gate.asked()[2].0, "RU1");
    }

    #[test]
    fn test_choose_connection() {
        let connections = vec![HostingConnection::named("HV1"), HostingConnection::named("HV2")];
        let mut out = Vec::new();
        let chosen = choose_connection(Cursor::new("  HV2 \n"), &mut out, &connections).unwrap();
        assert_eq!(chosen.as_deref(), Some("HV2"));

        let listing = String::from_utf8(out).unwrap();
        assert!(listing.contains("  HV1\n"));
        assert!(listing.contains("  HV2\n"));

        let none = choose_connection(Cursor::new(""), Vec::new(), &connections).unwrap();
        assert!(none.is_none());
    }
}
