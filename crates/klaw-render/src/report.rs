use serde::Serialize;

use klaw_core::reconcile::{ReconcileWarning, ReportRow, RowStatus, Summary};
use klaw_core::track::{TrackOutcome, TrackStatus};

use crate::table::{Cell, Table, Tone};
use crate::{Format, RenderError};

fn status_tone(status: &RowStatus) -> Tone {
    match status {
        RowStatus::RemoteOnly => Tone::Dim,
        RowStatus::InSync => Tone::Cyan,
        RowStatus::Drifted { .. } | RowStatus::MarkerChanged { .. } => Tone::Yellow,
        RowStatus::Updated { .. } => Tone::Green,
        RowStatus::UpdateFailed { .. } | RowStatus::Untracked => Tone::Red,
        RowStatus::Recorded => Tone::Plain,
    }
}

/// `#5:closed`, with the local state appended when the two sides disagree.
pub fn issue_cell(row: &ReportRow) -> String {
    let Some(number) = row.number.as_deref() else {
        return "-".to_string();
    };
    let state = row.state.as_deref().unwrap_or("");
    match &row.status {
        RowStatus::Drifted { local_state }
        | RowStatus::MarkerChanged { local_state }
        | RowStatus::UpdateFailed { local_state, .. } => {
            format!("#{}:{} (!{})", number, state, local_state)
        }
        RowStatus::Updated { previous_state } => {
            format!("#{}:{} (was {})", number, state, previous_state)
        }
        _ => format!("#{}:{}", number, state),
    }
}

pub fn summary_line(summary: &Summary) -> String {
    let mut parts = vec![
        format!("{} not-in-src", summary.remote_only),
        format!("{} in sync", summary.in_sync),
        format!("{} drifted", summary.drifted),
    ];
    if summary.updated > 0 {
        parts.push(format!("{} updated", summary.updated));
    }
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed));
    }
    parts.push(format!("{} untracked", summary.untracked));
    if summary.recorded > 0 {
        parts.push(format!("{} recorded", summary.recorded));
    }
    parts.join(", ")
}

#[derive(Serialize)]
struct JsonReport<'a> {
    rows: &'a [ReportRow],
    warnings: &'a [ReconcileWarning],
    summary: Summary,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    status: &'static str,
    number: &'a str,
    state: &'a str,
    local_state: &'a str,
    file: String,
    line: Option<usize>,
    title: &'a str,
}

fn local_state(status: &RowStatus) -> &str {
    match status {
        RowStatus::Drifted { local_state }
        | RowStatus::MarkerChanged { local_state }
        | RowStatus::UpdateFailed { local_state, .. } => local_state,
        RowStatus::Updated { previous_state } => previous_state,
        _ => "",
    }
}

pub fn render_report(
    rows: &[ReportRow],
    warnings: &[ReconcileWarning],
    summary: Summary,
    format: Format,
    colors: bool,
) -> Result<String, RenderError> {
    match format {
        Format::Table => Ok(report_table(rows, summary, colors)),
        Format::Json => {
            let payload = JsonReport {
                rows,
                warnings,
                summary,
            };
            Ok(serde_json::to_string_pretty(&payload)? + "\n")
        }
        Format::Csv => {
            let records = rows.iter().map(|row| CsvRow {
                status: row.status.label(),
                number: row.number.as_deref().unwrap_or(""),
                state: row.state.as_deref().unwrap_or(""),
                local_state: local_state(&row.status),
                file: row
                    .file
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                line: row.line,
                title: &row.title,
            });
            crate::write_csv(records)
        }
    }
}

fn report_table(rows: &[ReportRow], summary: Summary, colors: bool) -> String {
    let mut table = Table::new(["#", "STATUS", "ISSUE", "LOCATION", "TITLE"]);
    for (idx, row) in rows.iter().enumerate() {
        let tone = status_tone(&row.status);
        table.push(vec![
            Cell::new((idx + 1).to_string(), Tone::Dim),
            Cell::new(row.status.label(), tone),
            Cell::new(issue_cell(row), Tone::Yellow),
            Cell::plain(row.location().unwrap_or_default()),
            Cell::plain(row.title.clone()),
        ]);
    }
    format!("{}{}\n", table.render(colors), summary_line(&summary))
}

/// A single `[warn]` line, for stderr.
pub fn render_note(message: impl std::fmt::Display, colors: bool) -> String {
    format!("{} {}\n", Cell::new("[warn]", Tone::Yellow).styled(colors), message)
}

/// One `[warn]` line per warning, for stderr.
pub fn render_warnings(warnings: &[ReconcileWarning], colors: bool) -> String {
    warnings
        .iter()
        .map(|warning| render_note(warning, colors))
        .collect()
}

fn track_label(status: &TrackStatus) -> (&'static str, Tone) {
    match status {
        TrackStatus::Tracked { .. } => ("created", Tone::Green),
        TrackStatus::CreatedNotRewritten { .. } => ("created, marker moved", Tone::Yellow),
        TrackStatus::RewriteFailed { .. } => ("created, rewrite failed", Tone::Red),
        TrackStatus::Declined => ("skipped", Tone::Dim),
        TrackStatus::EmptyText => ("empty", Tone::Dim),
    }
}

fn track_issue(status: &TrackStatus) -> Option<(u64, &str)> {
    match status {
        TrackStatus::Tracked { number, state, .. }
        | TrackStatus::CreatedNotRewritten { number, state }
        | TrackStatus::RewriteFailed { number, state, .. } => Some((*number, state.as_str())),
        TrackStatus::Declined | TrackStatus::EmptyText => None,
    }
}

#[derive(Serialize)]
struct JsonTrack<'a> {
    outcomes: &'a [TrackOutcome],
    created: usize,
    aborted: Option<&'a str>,
}

#[derive(Serialize)]
struct CsvTrack<'a> {
    result: &'static str,
    number: Option<u64>,
    state: &'a str,
    location: String,
    text: &'a str,
    error: &'a str,
}

pub fn render_track(
    outcomes: &[TrackOutcome],
    aborted: Option<&str>,
    format: Format,
    colors: bool,
) -> Result<String, RenderError> {
    let created = outcomes
        .iter()
        .filter(|outcome| track_issue(&outcome.status).is_some())
        .count();
    match format {
        Format::Table => {
            let mut table = Table::new(["#", "RESULT", "ISSUE", "LOCATION", "TEXT"]);
            for (idx, outcome) in outcomes.iter().enumerate() {
                let (label, tone) = track_label(&outcome.status);
                let issue = track_issue(&outcome.status)
                    .map(|(number, state)| format!("#{}:{}", number, state))
                    .unwrap_or_else(|| "-".to_string());
                let location = match &outcome.status {
                    TrackStatus::Tracked { line, .. } => {
                        format!("{}:{}", outcome.annotation.source_file.display(), line)
                    }
                    _ => outcome.annotation.location(),
                };
                table.push(vec![
                    Cell::new((idx + 1).to_string(), Tone::Dim),
                    Cell::new(label, tone),
                    Cell::new(issue, Tone::Yellow),
                    Cell::plain(location),
                    Cell::plain(outcome.annotation.text.clone()),
                ]);
            }
            let mut out = if table.is_empty() {
                "no untracked annotations\n".to_string()
            } else {
                table.render(colors)
            };
            out.push_str(&format!("{} issue(s) created\n", created));
            for outcome in outcomes {
                if let TrackStatus::RewriteFailed { error, .. } = &outcome.status {
                    out.push_str(&format!("{}: {}\n", outcome.annotation.location(), error));
                }
            }
            if let Some(reason) = aborted {
                out.push_str(&format!("stopped early: {}\n", reason));
            }
            Ok(out)
        }
        Format::Json => {
            let payload = JsonTrack {
                outcomes,
                created,
                aborted,
            };
            Ok(serde_json::to_string_pretty(&payload)? + "\n")
        }
        Format::Csv => {
            let records = outcomes.iter().map(|outcome| {
                let issue = track_issue(&outcome.status);
                CsvTrack {
                    result: track_label(&outcome.status).0,
                    number: issue.map(|(number, _)| number),
                    state: issue.map(|(_, state)| state).unwrap_or(""),
                    location: outcome.annotation.location(),
                    text: &outcome.annotation.text,
                    error: match &outcome.status {
                        TrackStatus::RewriteFailed { error, .. } => error,
                        _ => "",
                    },
                }
            });
            crate::write_csv(records)
        }
    }
}

/// Two-column KEY/VALUE table of resolved settings.
pub fn render_settings(entries: &[(&str, String)], colors: bool) -> String {
    let mut table = Table::new(["KEY", "VALUE"]);
    for (key, value) in entries {
        table.push(vec![Cell::new(*key, Tone::Cyan), Cell::plain(value.clone())]);
    }
    table.render(colors)
}
