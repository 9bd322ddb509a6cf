use serde::Serialize;
use tracing::{info, warn};

use crate::annotation::Annotation;
use crate::issue::{IssueError, IssueTracker, NewIssue};
use crate::rewrite::{AnnotationWriter, RewriteOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TrackStatus {
    Tracked { number: u64, state: String, line: usize },
    /// The issue exists but its marker could not be located for rewriting.
    CreatedNotRewritten { number: u64, state: String },
    RewriteFailed { number: u64, state: String, error: String },
    Declined,
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackOutcome {
    pub annotation: Annotation,
    pub status: TrackStatus,
}

#[derive(Debug, Default)]
pub struct TrackReport {
    pub outcomes: Vec<TrackOutcome>,
    /// Set when a create request failed; later annotations were not attempted.
    pub aborted: Option<IssueError>,
}

impl TrackReport {
    pub fn tracked(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, TrackStatus::Tracked { .. }))
            .count()
    }
}

/// Create an issue for each untracked annotation `confirm` accepts and embed
/// the assigned number and state into its marker.
///
/// A failed create stops the run, since every later request would hit the
/// same tracker. A failed rewrite only affects its own annotation.
pub fn track_untracked(
    annotations: &[Annotation],
    tracker: &dyn IssueTracker,
    writer: &dyn AnnotationWriter,
    assignee: Option<&str>,
    confirm: &mut dyn FnMut(&Annotation) -> bool,
) -> TrackReport {
    let mut report = TrackReport::default();

    for annotation in annotations.iter().filter(|annotation| !annotation.is_tracked()) {
        if annotation.text.is_empty() {
            report.outcomes.push(TrackOutcome {
                annotation: annotation.clone(),
                status: TrackStatus::EmptyText,
            });
            continue;
        }
        if !confirm(annotation) {
            report.outcomes.push(TrackOutcome {
                annotation: annotation.clone(),
                status: TrackStatus::Declined,
            });
            continue;
        }

        let created = match tracker.create_issue(&NewIssue::from_text(&annotation.text, assignee)) {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %err, "issue creation failed; stopping");
                report.aborted = Some(err);
                break;
            }
        };
        info!(number = created.number, location = %annotation.location(), "created issue");

        let status = match writer.track(annotation, created.number, &created.state) {
            Ok(RewriteOutcome::Rewritten { line }) => TrackStatus::Tracked {
                number: created.number,
                state: created.state.clone(),
                line,
            },
            Ok(RewriteOutcome::Unchanged) => TrackStatus::CreatedNotRewritten {
                number: created.number,
                state: created.state.clone(),
            },
            Err(err) => TrackStatus::RewriteFailed {
                number: created.number,
                state: created.state.clone(),
                error: err.to_string(),
            },
        };
        report.outcomes.push(TrackOutcome {
            annotation: annotation.clone(),
            status,
        });
    }

    report
}
