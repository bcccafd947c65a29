//! Text rendering for reports and listings

use crate::orchestrator::{Disposition, TeardownReport};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use hosting_teardown_common::{HostingConnection, ResourceUnit, StepOutcome};

fn table(header: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn outcome_cell(outcome: &StepOutcome) -> Cell {
    match outcome {
        StepOutcome::Succeeded => Cell::new("succeeded").fg(Color::Green),
        StepOutcome::Failed { .. } => Cell::new("failed").fg(Color::Red),
        StepOutcome::Declined => Cell::new("declined").fg(Color::Yellow),
    }
}

/// Steps of a teardown as a table
pub fn steps_table(report: &TeardownReport) -> Table {
    let mut table = table(vec![
        Cell::new("#"),
        Cell::new("Phase"),
        Cell::new("Step"),
        Cell::new("Target"),
        Cell::new("Outcome"),
        Cell::new("Detail"),
    ]);

    for (i, step) in report.steps.iter().enumerate() {
        let detail = match &step.outcome {
            StepOutcome::Failed { reason } => reason.clone(),
            _ => String::new(),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(step.kind.phase() + 1),
            Cell::new(step.kind.action()),
            Cell::new(&step.target),
            outcome_cell(&step.outcome),
            Cell::new(detail),
        ]);
    }

    table
}

/// Full text report: header, steps and summary
pub fn render_text(report: &TeardownReport) -> String {
    let mode = if report.resource_only {
        "resource connection only"
    } else {
        "full"
    };
    let mut out = format!(
        "Hosting connection: {}\nMode: {}\n",
        report.connection, mode
    );

    if let Some(unit) = &report.saved_unit_id {
        out.push_str(&format!("Resource unit with active task: {unit}\n"));
    }

    if report.disposition != Disposition::NoActiveTask && !report.steps.is_empty() {
        out.push_str(&format!("\n{}\n", steps_table(report)));
    }

    if report.disposition == Disposition::Completed && !report.resource_only {
        let kept: Vec<_> = report
            .steps
            .iter()
            .filter(|s| s.kind.removes_parent() && !s.outcome.is_success())
            .map(|s| s.kind.action().to_lowercase())
            .collect();
        if !kept.is_empty() {
            out.push_str(&format!(
                "\nHosting connection left in place (not done: {})\n",
                kept.join(", ")
            ));
        }
    }

    out.push_str(&format!("\n{}\n", capitalize(&report.summary())));
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Hosting connections and their units as a table
pub fn connections_table(connections: &[(HostingConnection, Vec<ResourceUnit>)]) -> Table {
    let mut table = table(vec![
        Cell::new("Hosting connection"),
        Cell::new("Resource units"),
        Cell::new("Path"),
    ]);

    for (conn, units) in connections {
        let names = units
            .iter()
            .map(|u| u.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&conn.name),
            Cell::new(if names.is_empty() { "-".to_string() } else { names }),
            Cell::new(conn.config_path()),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StepRecord;
    use hosting_teardown_common::StepKind;

    fn report() -> TeardownReport {
        TeardownReport {
            connection: "HV1".to_string(),
            resource_only: false,
            disposition: Disposition::Completed,
            saved_unit_id: Some("RU1".to_string()),
            steps: vec![
                StepRecord {
                    kind: StepKind::StopTask,
                    target: "T1".to_string(),
                    outcome: StepOutcome::Succeeded,
                    operation: None,
                },
                StepRecord {
                    kind: StepKind::RemoveHostingConnection,
                    target: "HV1".to_string(),
                    outcome: StepOutcome::failed("object in use"),
                    operation: None,
                },
            ],
        }
    }

    #[test]
    fn test_render_text_lists_steps() {
        let text = render_text(&report());
        assert!(text.starts_with("Hosting connection: HV1\nMode: full\n"));
        assert!(text.contains("Resource unit with active task: RU1"));
        assert!(text.contains("Stop provisioning task"));
        assert!(text.contains("object in use"));
        assert!(text.contains("2 steps: 1 succeeded, 1 failed, 0 declined"));
        assert!(text.contains("Hosting connection left in place (not done: remove hosting connection)"));
    }

    #[test]
    fn test_steps_table_shows_phase() {
        let rendered = steps_table(&report()).to_string();
        assert!(rendered.contains("Phase"));
        // Stop task is phase 1, connection removal phase 4
        let stop_row = rendered.lines().find(|l| l.contains("Stop provisioning task")).unwrap();
        assert!(stop_row.contains(" 1 "));
        let conn_row = rendered.lines().find(|l| l.contains("Remove hosting connection")).unwrap();
        assert!(conn_row.contains(" 4 "));
    }

    #[test]
    fn test_render_text_truncated_drain() {
        let mut report = report();
        report.disposition = Disposition::DrainTruncated;
        report.steps.truncate(1);

        let text = render_text(&report);
        assert!(text.contains("Stop provisioning task"));
        assert!(text.contains("Drain cap reached with active tasks left, nothing removed"));
        assert!(!text.contains("left in place"));
    }

    #[test]
    fn test_render_text_no_active_task() {
        let mut report = report();
        report.disposition = Disposition::NoActiveTask;
        report.saved_unit_id = None;
        report.steps.clear();

        let text = render_text(&report);
        assert!(text.ends_with("No active tasks found\n"));
        assert!(!text.contains("Outcome"));
    }

    #[test]
    fn test_connections_table() {
        let rendered = connections_table(&[
            (
                HostingConnection::named("HV1"),
                vec![ResourceUnit::new("RU1", "HV1"), ResourceUnit::new("RU2", "HV1")],
            ),
            (HostingConnection::named("HV2"), vec![]),
        ])
        .to_string();
        assert!(rendered.contains("RU1, RU2"));
        assert!(rendered.contains(r"XDHyp:\Connections\HV2"));
    }
}
