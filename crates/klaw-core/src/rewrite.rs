use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::annotation::{format_block, format_marker, Annotation, AnnotationPattern};

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum RewriteOutcome {
    Rewritten { line: usize },
    /// No marker line carried the expected text; the file was left as is.
    Unchanged,
}

/// Persists identifier/state changes of an annotation back to its source.
pub trait AnnotationWriter {
    /// `(#old:status) text` -> `(#number:state) text`, keeping the text as written.
    fn update_state(
        &self,
        annotation: &Annotation,
        number: u64,
        state: &str,
    ) -> Result<RewriteOutcome, RewriteError>;

    /// `text` -> `(#number:state) text`.
    fn track(
        &self,
        annotation: &Annotation,
        number: u64,
        state: &str,
    ) -> Result<RewriteOutcome, RewriteError>;
}

/// Rewrites markers in place, touching only the line that holds them.
#[derive(Debug, Clone)]
pub struct FileRewriter {
    pattern: AnnotationPattern,
}

impl FileRewriter {
    pub fn new(pattern: AnnotationPattern) -> Self {
        Self { pattern }
    }

    fn rewrite(
        &self,
        annotation: &Annotation,
        edit: MarkerEdit<'_>,
    ) -> Result<RewriteOutcome, RewriteError> {
        let path = &annotation.source_file;
        let content = fs::read_to_string(path).map_err(|source| RewriteError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let Some((updated, line)) = replace_marker(&content, &self.pattern, annotation, edit) else {
            debug!(path = %path.display(), "marker not found; leaving file untouched");
            return Ok(RewriteOutcome::Unchanged);
        };
        write_file(path, &updated)?;
        Ok(RewriteOutcome::Rewritten { line })
    }
}

impl AnnotationWriter for FileRewriter {
    fn update_state(
        &self,
        annotation: &Annotation,
        number: u64,
        state: &str,
    ) -> Result<RewriteOutcome, RewriteError> {
        let block = format_block(number, state);
        self.rewrite(annotation, MarkerEdit::Block(&block))
    }

    fn track(
        &self,
        annotation: &Annotation,
        number: u64,
        state: &str,
    ) -> Result<RewriteOutcome, RewriteError> {
        let prefix = format_marker(number, state, "");
        self.rewrite(annotation, MarkerEdit::Prefix(&prefix))
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), RewriteError> {
    fs::write(path, content).map_err(|source| RewriteError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// How a marker line changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEdit<'a> {
    /// Replace the existing `(#N:S)` block; the text after it stays as written.
    Block(&'a str),
    /// Insert in front of the marker text of an untracked annotation.
    Prefix(&'a str),
}

/// Apply `edit` to the marker line of `annotation`.
///
/// The captured line is tried first, then every line in order. A line
/// qualifies when its first marker carries the same identifier, status and
/// text as `annotation`. Returns the new content and the 1-based line that
/// changed.
pub fn replace_marker(
    content: &str,
    pattern: &AnnotationPattern,
    annotation: &Annotation,
    edit: MarkerEdit<'_>,
) -> Option<(String, usize)> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let qualifies = |idx: usize| -> Option<Range<usize>> {
        let line = lines.get(idx)?;
        let found = pattern
            .extract(line, &annotation.source_file)
            .into_iter()
            .next()?;
        if found.identifier != annotation.identifier
            || found.status != annotation.status
            || found.text != annotation.text
        {
            return None;
        }
        match edit {
            MarkerEdit::Block(_) => pattern.block_span(line),
            MarkerEdit::Prefix(_) => pattern.body_start(line).map(|start| start..start),
        }
    };

    let anchored = annotation
        .line_number
        .and_then(|line| line.checked_sub(1))
        .and_then(|idx| qualifies(idx).map(|span| (idx, span)));
    let (target, span) =
        anchored.or_else(|| (0..lines.len()).find_map(|idx| qualifies(idx).map(|span| (idx, span))))?;

    let replacement = match edit {
        MarkerEdit::Block(text) | MarkerEdit::Prefix(text) => text,
    };
    let mut updated = String::with_capacity(content.len() + replacement.len());
    for (idx, line) in lines.iter().enumerate() {
        if idx == target {
            updated.push_str(&line[..span.start]);
            updated.push_str(replacement);
            updated.push_str(&line[span.end..]);
        } else {
            updated.push_str(line);
        }
    }
    Some((updated, target + 1))
}
