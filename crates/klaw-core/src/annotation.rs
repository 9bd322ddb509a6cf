use std::fmt::Display;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid annotation pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A TODO marker found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub identifier: Option<String>,
    pub status: Option<String>,
    pub source_file: PathBuf,
    /// 1-based; `None` when the secondary line lookup found nothing.
    pub line_number: Option<usize>,
}

impl Annotation {
    pub fn is_tracked(&self) -> bool {
        self.identifier.is_some()
    }

    pub fn status_str(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    /// `path:line`, with `?` standing in for an unknown line.
    pub fn location(&self) -> String {
        match self.line_number {
            Some(line) => format!("{}:{}", self.source_file.display(), line),
            None => format!("{}:?", self.source_file.display()),
        }
    }
}

/// Compiled `<symbol> <keyword>:` matcher.
#[derive(Debug, Clone)]
pub struct AnnotationPattern {
    regex: Regex,
}

impl AnnotationPattern {
    pub fn new(symbol: &str, keyword: &str) -> Result<Self, ScanError> {
        let source = format!(
            r"(?i){}[ \t]*{}:[ \t]*(\(#(\d+):(\w+)\))?(.*)",
            regex::escape(symbol),
            regex::escape(keyword)
        );
        Ok(Self {
            regex: Regex::new(&source)?,
        })
    }

    /// Byte offset in `line` where the first marker's body begins: the
    /// identifier block when present, the free text otherwise.
    pub fn body_start(&self, line: &str) -> Option<usize> {
        let caps = self.regex.captures(line)?;
        caps.get(1)
            .or_else(|| caps.get(4))
            .map(|body| body.start())
    }

    /// Byte range of the first marker's `(#N:S)` block in `line`, if it has one.
    pub fn block_span(&self, line: &str) -> Option<Range<usize>> {
        self.regex.captures(line)?.get(1).map(|block| block.range())
    }

    /// Every annotation in `content`, in document order.
    pub fn extract(&self, content: &str, source_file: &Path) -> Vec<Annotation> {
        self.regex
            .captures_iter(content)
            .map(|caps| {
                let identifier = caps.get(2).map(|m| m.as_str().to_string());
                let status = caps.get(3).map(|m| m.as_str().to_string());
                let raw = caps.get(4).map(|m| m.as_str()).unwrap_or("");
                let text = raw.trim().to_string();
                let line_number = resolve_line_number(content, &text);
                Annotation {
                    text,
                    identifier,
                    status,
                    source_file: source_file.to_path_buf(),
                    line_number,
                }
            })
            .collect()
    }
}

impl Default for AnnotationPattern {
    fn default() -> Self {
        let source = r"(?i)//[ \t]*todo:[ \t]*(\(#(\d+):(\w+)\))?(.*)";
        Self {
            regex: Regex::new(source).expect("regex"),
        }
    }
}

/// First line (1-based) whose content contains the trimmed `text`.
///
/// Separate from extraction; when the same text occurs earlier in the file
/// the earlier line wins.
pub fn resolve_line_number(content: &str, text: &str) -> Option<usize> {
    let needle = text.trim();
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|idx| idx + 1)
}

pub fn format_block(number: impl Display, state: &str) -> String {
    format!("(#{}:{})", number, state)
}

pub fn format_marker(number: impl Display, state: &str, text: &str) -> String {
    format!("{} {}", format_block(number, state), text)
}

pub fn scan_file(path: &Path, pattern: &AnnotationPattern) -> Result<Vec<Annotation>, ScanError> {
    let content = fs::read_to_string(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(pattern.extract(&content, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extract(content: &str) -> Vec<Annotation> {
        AnnotationPattern::default().extract(content, Path::new("main.go"))
    }

    #[test]
    fn untracked_annotation_has_no_identifier_or_status() {
        let found = extract("package main\n// TODO:   wire the cache   \n");
        assert_eq!(found.len(), 1);
        let annotation = &found[0];
        assert!(!annotation.is_tracked());
        assert_eq!(annotation.identifier, None);
        assert_eq!(annotation.status, None);
        assert_eq!(annotation.text, "wire the cache");
        assert_eq!(annotation.line_number, Some(2));
    }

    #[test]
    fn tracked_annotation_reads_identifier_block() {
        let found = extract("x := 1 // todo: (#42:open) fix the thing\n");
        let annotation = &found[0];
        assert!(annotation.is_tracked());
        assert_eq!(annotation.identifier.as_deref(), Some("42"));
        assert_eq!(annotation.status.as_deref(), Some("open"));
        assert_eq!(annotation.text, "fix the thing");
        assert_eq!(format_marker(42, "open", &annotation.text), "(#42:open) fix the thing");
    }

    #[test]
    fn symbol_and_keyword_match_case_insensitively() {
        let pattern = AnnotationPattern::new("#", "Fixme").expect("pattern");
        let found = pattern.extract("# FIXME: a\n#fixme:b\n", Path::new("a.py"));
        let texts: Vec<&str> = found.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn symbol_metacharacters_are_literal() {
        let pattern = AnnotationPattern::new("/*", "todo").expect("pattern");
        let found = pattern.extract("/* TODO: escape me */\n// todo: not me\n", Path::new("a.c"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "escape me */");
    }

    #[test]
    fn identifier_block_with_empty_text_is_valid() {
        let found = extract("// TODO: (#7:closed)\n");
        assert_eq!(found[0].identifier.as_deref(), Some("7"));
        assert_eq!(found[0].status.as_deref(), Some("closed"));
        assert_eq!(found[0].text, "");
    }

    #[test]
    fn malformed_identifier_block_becomes_text() {
        let found = extract("// TODO: (#7:open fix it\n");
        assert!(!found[0].is_tracked());
        assert_eq!(found[0].text, "(#7:open fix it");
    }

    #[test]
    fn marker_does_not_capture_following_line() {
        let found = extract("// TODO:\nlet x = 1;\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "");
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let found = extract("// TODO: windows\r\nother\r\n");
        assert_eq!(found[0].text, "windows");
        assert_eq!(found[0].line_number, Some(1));
    }

    #[test]
    fn line_lookup_prefers_first_occurrence() {
        let content = "let s = \"fix X\";\n// TODO: fix X\n";
        let found = extract(content);
        assert_eq!(found[0].line_number, Some(1));
    }

    #[test]
    fn body_start_points_past_the_keyword() {
        let pattern = AnnotationPattern::default();
        let line = "    // TODO:  (#3:open) x";
        assert_eq!(pattern.body_start(line), Some(14));
        assert_eq!(pattern.body_start("    // TODO: x"), Some(13));
        assert_eq!(pattern.body_start("no marker"), None);
    }

    #[test]
    fn block_span_covers_only_the_identifier_block() {
        let pattern = AnnotationPattern::default();
        let line = "// TODO: (#7:open)fix";
        let span = pattern.block_span(line).expect("span");
        assert_eq!(&line[span], "(#7:open)");
        assert_eq!(pattern.block_span("// TODO: untracked"), None);
        assert_eq!(pattern.block_span("// TODO: x (#7:open)"), None);
    }

    #[test]
    fn resolve_line_number_misses_are_none() {
        assert_eq!(resolve_line_number("a\nb\n", "zzz"), None);
    }

    #[test]
    fn location_marks_unknown_lines() {
        let annotation = Annotation {
            text: "x".to_string(),
            identifier: None,
            status: None,
            source_file: PathBuf::from("src/a.go"),
            line_number: None,
        };
        assert_eq!(annotation.location(), "src/a.go:?");
    }

    #[test]
    fn scan_file_reports_unreadable_paths() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("missing.go");
        let err = scan_file(&missing, &AnnotationPattern::default()).unwrap_err();
        assert!(matches!(err, ScanError::Read { .. }));
    }

    #[test]
    fn scan_file_sets_source_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("a.go");
        fs::write(&path, "// TODO: one\n// TODO: (#2:open) two\n").expect("write");
        let found = scan_file(&path, &AnnotationPattern::default()).expect("scan");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a.source_file == path));
        assert_eq!(found[1].line_number, Some(2));
    }
}
