//! Joins local annotations with remote issues and classifies every pairing.
//!
//! Remote issues produce rows in tracker order; untracked annotations follow
//! in scan order. Drifted annotations are rewritten only when the caller asks
//! for it, through an [`AnnotationWriter`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::annotation::Annotation;
use crate::issue::RemoteIssue;
use crate::rewrite::{AnnotationWriter, RewriteOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Rewrite drifted annotations to the remote state.
    pub apply_updates: bool,
    /// Drop rows whose resolved state is `closed`.
    pub skip_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowStatus {
    /// Issue exists remotely but no annotation references it.
    RemoteOnly,
    InSync,
    /// Local status differs from the remote state; nothing was written.
    Drifted { local_state: String },
    Updated { previous_state: String },
    /// The marker no longer matches what was scanned, so no rewrite happened.
    MarkerChanged { local_state: String },
    UpdateFailed { local_state: String, error: String },
    Untracked,
    /// Offline listing: state as recorded in the annotation.
    Recorded,
}

impl RowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::RemoteOnly => "not-in-src",
            RowStatus::InSync => "in sync",
            RowStatus::Drifted { .. } => "drifted",
            RowStatus::Updated { .. } => "updated",
            RowStatus::MarkerChanged { .. } => "marker changed",
            RowStatus::UpdateFailed { .. } => "update failed",
            RowStatus::Untracked => "untracked",
            RowStatus::Recorded => "recorded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub status: RowStatus,
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
    pub number: Option<String>,
    pub state: Option<String>,
    pub title: String,
}

impl ReportRow {
    fn remote(issue: &RemoteIssue, annotation: Option<&Annotation>, status: RowStatus) -> Self {
        Self {
            status,
            file: annotation.map(|a| a.source_file.clone()),
            line: annotation.and_then(|a| a.line_number),
            number: Some(issue.number.to_string()),
            state: Some(issue.state.clone()),
            title: issue.title.clone(),
        }
    }

    fn local(annotation: &Annotation, status: RowStatus) -> Self {
        Self {
            status,
            file: Some(annotation.source_file.clone()),
            line: annotation.line_number,
            number: annotation.identifier.clone(),
            state: annotation.status.clone(),
            title: annotation.text.clone(),
        }
    }

    fn is_closed(&self) -> bool {
        self.state
            .as_deref()
            .map(|state| state.trim().eq_ignore_ascii_case("closed"))
            .unwrap_or(false)
    }

    /// `file:line`, `file:?` for an unknown line, `None` for remote-only rows.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        Some(match self.line {
            Some(line) => format!("{}:{}", file.display(), line),
            None => format!("{}:?", file.display()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileWarning {
    /// A later annotation reuses an identifier; only the first takes part in the join.
    DuplicateIdentifier {
        identifier: String,
        kept: String,
        ignored: String,
    },
    /// A tracked annotation points at an issue the tracker does not know.
    UnknownIssue { identifier: String, location: String },
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileWarning::DuplicateIdentifier {
                identifier,
                kept,
                ignored,
            } => write!(
                f,
                "#{} is referenced more than once; using {} and ignoring {}",
                identifier, kept, ignored
            ),
            ReconcileWarning::UnknownIssue {
                identifier,
                location,
            } => write!(f, "{} references #{} which does not exist remotely", location, identifier),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub remote_only: usize,
    pub in_sync: usize,
    pub drifted: usize,
    pub updated: usize,
    pub failed: usize,
    pub untracked: usize,
    pub recorded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub rows: Vec<ReportRow>,
    pub warnings: Vec<ReconcileWarning>,
}

impl Reconciliation {
    pub fn summary(&self) -> Summary {
        summarize(&self.rows)
    }
}

pub fn summarize(rows: &[ReportRow]) -> Summary {
    let mut summary = Summary::default();
    for row in rows {
        match row.status {
            RowStatus::RemoteOnly => summary.remote_only += 1,
            RowStatus::InSync => summary.in_sync += 1,
            RowStatus::Drifted { .. } => summary.drifted += 1,
            RowStatus::Updated { .. } => summary.updated += 1,
            RowStatus::MarkerChanged { .. } | RowStatus::UpdateFailed { .. } => summary.failed += 1,
            RowStatus::Untracked => summary.untracked += 1,
            RowStatus::Recorded => summary.recorded += 1,
        }
    }
    summary
}

struct Join<'a> {
    tracked: HashMap<&'a str, &'a Annotation>,
    untracked: Vec<&'a Annotation>,
    warnings: Vec<ReconcileWarning>,
}

fn join_annotations<'a>(annotations: &'a [Annotation], issues: &[RemoteIssue]) -> Join<'a> {
    let mut tracked: HashMap<&str, &Annotation> = HashMap::new();
    let mut kept: Vec<&Annotation> = Vec::new();
    let mut untracked = Vec::new();
    let mut warnings = Vec::new();

    for annotation in annotations {
        let Some(identifier) = annotation.identifier.as_deref() else {
            untracked.push(annotation);
            continue;
        };
        match tracked.get(identifier) {
            Some(first) => warnings.push(ReconcileWarning::DuplicateIdentifier {
                identifier: identifier.to_string(),
                kept: first.location(),
                ignored: annotation.location(),
            }),
            None => {
                tracked.insert(identifier, annotation);
                kept.push(annotation);
            }
        }
    }

    let remote_numbers: HashSet<String> = issues.iter().map(|issue| issue.number.to_string()).collect();
    for annotation in kept {
        let identifier = annotation.identifier.as_deref().unwrap_or_default();
        if !remote_numbers.contains(identifier) {
            warnings.push(ReconcileWarning::UnknownIssue {
                identifier: identifier.to_string(),
                location: annotation.location(),
            });
        }
    }

    Join {
        tracked,
        untracked,
        warnings,
    }
}

/// Classify every remote issue and local annotation, rewriting drifted
/// annotations through `writer` when `options.apply_updates` is set.
pub fn reconcile(
    annotations: &[Annotation],
    issues: &[RemoteIssue],
    options: ReconcileOptions,
    writer: &dyn AnnotationWriter,
) -> Reconciliation {
    let join = join_annotations(annotations, issues);
    let mut rows = Vec::new();

    for issue in issues {
        let key = issue.number.to_string();
        let skip = options.skip_closed && issue.is_closed();
        let row = match join.tracked.get(key.as_str()).copied() {
            None => ReportRow::remote(issue, None, RowStatus::RemoteOnly),
            Some(annotation) if annotation.status_str() == issue.state => {
                ReportRow::remote(issue, Some(annotation), RowStatus::InSync)
            }
            Some(annotation) if options.apply_updates => {
                let status = apply_update(annotation, issue, writer);
                ReportRow::remote(issue, Some(annotation), status)
            }
            Some(annotation) => ReportRow::remote(
                issue,
                Some(annotation),
                RowStatus::Drifted {
                    local_state: annotation.status_str().to_string(),
                },
            ),
        };
        if skip {
            continue;
        }
        rows.push(row);
    }

    rows.extend(
        join.untracked
            .into_iter()
            .map(|annotation| ReportRow::local(annotation, RowStatus::Untracked)),
    );

    for warning in &join.warnings {
        warn!("{}", warning);
    }

    Reconciliation {
        rows,
        warnings: join.warnings,
    }
}

fn apply_update(annotation: &Annotation, issue: &RemoteIssue, writer: &dyn AnnotationWriter) -> RowStatus {
    let local_state = annotation.status_str().to_string();
    match writer.update_state(annotation, issue.number, &issue.state) {
        Ok(RewriteOutcome::Rewritten { .. }) => RowStatus::Updated {
            previous_state: local_state,
        },
        Ok(RewriteOutcome::Unchanged) => RowStatus::MarkerChanged { local_state },
        Err(err) => {
            warn!(error = %err, location = %annotation.location(), "rewrite failed");
            RowStatus::UpdateFailed {
                local_state,
                error: err.to_string(),
            }
        }
    }
}

/// Listing without remote data: every annotation in scan order, with its
/// recorded state trusted as is.
pub fn list_offline(annotations: &[Annotation], skip_closed: bool) -> Vec<ReportRow> {
    annotations
        .iter()
        .map(|annotation| {
            let status = if annotation.is_tracked() {
                RowStatus::Recorded
            } else {
                RowStatus::Untracked
            };
            ReportRow::local(annotation, status)
        })
        .filter(|row| !(skip_closed && row.is_closed()))
        .collect()
}
