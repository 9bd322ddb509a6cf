use anyhow::{Context, Result};

use klaw_core::annotation::{Annotation, AnnotationPattern};
use klaw_core::config::{ConfigError, Settings};
use klaw_core::github::{discover_repo, GithubTracker};
use klaw_core::issue::IssueTracker;
use klaw_core::reconcile::{list_offline, reconcile, summarize, ReconcileOptions};
use klaw_core::rewrite::FileRewriter;
use klaw_core::track::track_untracked;
use klaw_core::walker::collect_annotations;
use klaw_render::{
    render_note, render_report, render_settings, render_track, render_warnings, Format,
};

use crate::prompt::confirm_annotation;
use crate::{Colors, CreateArgs, ListArgs};

fn scan(settings: &Settings, pattern: &AnnotationPattern) -> Vec<Annotation> {
    let report = collect_annotations(&settings.scope(), pattern);
    if !report.skipped.is_empty() {
        tracing::info!(count = report.skipped.len(), "files skipped during scan");
    }
    report.annotations
}

/// Credential and repository checks happen before any scan.
fn connect(settings: &Settings) -> Result<GithubTracker> {
    let token = settings.token()?;
    let repo = discover_repo(&settings.root)?;
    tracing::debug!(repo = %repo.slug(), "using repository");
    let tracker = GithubTracker::new(repo, token).context("failed to set up GitHub client")?;
    Ok(tracker)
}

const OFFLINE_NOTE: &str = "offline mode: states of tracked TODOs may be out of date";

/// Listing without remote state. Recorded states are shown as written.
fn print_offline(annotations: &[Annotation], args: &ListArgs, colors: Colors) -> Result<()> {
    eprint!("{}", render_note(OFFLINE_NOTE, colors.stderr));
    let rows = list_offline(annotations, args.skip_closed);
    print!(
        "{}",
        render_report(&rows, &[], summarize(&rows), args.format, colors.stdout)?
    );
    Ok(())
}

pub(crate) fn list(settings: &Settings, args: &ListArgs, colors: Colors) -> Result<()> {
    let pattern = settings.pattern()?;

    if args.offline {
        let annotations = scan(settings, &pattern);
        return print_offline(&annotations, args, colors);
    }

    let tracker = connect(settings)?;
    let annotations = scan(settings, &pattern);
    let issues = match tracker.list_issues() {
        Ok(issues) => issues,
        Err(err) => {
            print_offline(&annotations, args, colors)?;
            return Err(err)
                .with_context(|| format!("failed to fetch issues for {}", tracker.repo().slug()));
        }
    };

    let options = ReconcileOptions {
        apply_updates: args.update,
        skip_closed: args.skip_closed,
    };
    let result = reconcile(&annotations, &issues, options, &FileRewriter::new(pattern));
    eprint!("{}", render_warnings(&result.warnings, colors.stderr));
    print!(
        "{}",
        render_report(
            &result.rows,
            &result.warnings,
            result.summary(),
            args.format,
            colors.stdout
        )?
    );
    Ok(())
}

pub(crate) fn create(settings: &Settings, args: &CreateArgs, colors: Colors) -> Result<()> {
    if args.offline {
        return Err(ConfigError::Conflict(
            "create needs GitHub access and cannot run offline".to_string(),
        )
        .into());
    }
    let pattern = settings.pattern()?;
    let tracker = connect(settings)?;
    let annotations = scan(settings, &pattern);

    let yes = args.yes;
    let mut confirm = |annotation: &Annotation| yes || confirm_annotation(annotation);
    let report = track_untracked(
        &annotations,
        &tracker,
        &FileRewriter::new(pattern),
        settings.assignee.as_deref(),
        &mut confirm,
    );

    tracing::info!(
        attempted = report.outcomes.len(),
        tracked = report.tracked(),
        "issue creation finished"
    );
    let aborted = report.aborted.as_ref().map(ToString::to_string);
    print!(
        "{}",
        render_track(&report.outcomes, aborted.as_deref(), args.format, colors.stdout)?
    );
    match report.aborted {
        Some(err) => Err(anyhow::Error::new(err).context(format!(
            "issue creation stopped after {} issue(s)",
            report.outcomes.len()
        ))),
        None => Ok(()),
    }
}

pub(crate) fn show_config(settings: &Settings, colors: Colors) -> Result<()> {
    print!("{}", render_settings(&settings.describe(), colors.stdout));
    Ok(())
}
