use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::annotation::{scan_file, Annotation, AnnotationPattern, ScanError};

/// Bounds of a scan: where to look and what to skip.
#[derive(Debug, Clone)]
pub struct ScanScope {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    /// Directory leaf names that are never descended into.
    pub excluded_dirs: HashSet<String>,
}

impl ScanScope {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
            excluded_dirs: HashSet::new(),
        }
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dirs.extend(names.into_iter().map(Into::into));
        self
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|ext| !ext.is_empty() && name.ends_with(ext.as_str()))
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub annotations: Vec<Annotation>,
    pub skipped: Vec<ScanError>,
}

/// Files under the scope root whose name ends with one of the extensions,
/// sorted by path. Symlinks are not followed and unreadable entries are
/// skipped.
pub fn find_source_files(scope: &ScanScope) -> Vec<PathBuf> {
    let walker = WalkDir::new(&scope.root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !scope.excluded_dirs.contains(name.as_ref())
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if scope.matches_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

/// Scan every candidate file once and collect its annotations in path order.
pub fn collect_annotations(scope: &ScanScope, pattern: &AnnotationPattern) -> ScanReport {
    let mut report = ScanReport::default();
    for path in find_source_files(scope) {
        match scan_file(&path, pattern) {
            Ok(found) => {
                debug!(path = %path.display(), count = found.len(), "scanned file");
                report.annotations.extend(found);
            }
            Err(err) => {
                warn!(error = %err, "skipping file");
                report.skipped.push(err);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, content).expect("write");
        path
    }

    #[test]
    fn excluded_directories_are_never_entered() {
        let temp = TempDir::new().expect("tempdir");
        let kept = touch(temp.path(), "src/a.go", "");
        touch(temp.path(), "vendor/a.go", "");
        touch(temp.path(), "src/vendor/b.go", "");

        let scope = ScanScope::new(temp.path(), vec![".go".to_string()]).exclude(["vendor"]);
        assert_eq!(find_source_files(&scope), vec![kept]);
    }

    #[test]
    fn multiple_extensions_share_one_walk() {
        let temp = TempDir::new().expect("tempdir");
        let a = touch(temp.path(), "a.rs", "");
        let b = touch(temp.path(), "lib/b.py", "");
        touch(temp.path(), "c.txt", "");

        let scope = ScanScope::new(temp.path(), vec![".rs".to_string(), ".py".to_string()]);
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(find_source_files(&scope), expected);
    }

    #[test]
    fn root_named_like_an_excluded_dir_is_still_walked() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path().join("vendor");
        let file = touch(&root, "x.go", "");
        let scope = ScanScope::new(&root, vec![".go".to_string()]).exclude(["vendor"]);
        assert_eq!(find_source_files(&scope), vec![file]);
    }

    #[test]
    fn collect_annotations_keeps_path_order() {
        let temp = TempDir::new().expect("tempdir");
        touch(temp.path(), "b.go", "// TODO: second\n");
        touch(temp.path(), "a.go", "// TODO: first\n// TODO: (#3:open) third\n");

        let scope = ScanScope::new(temp.path(), vec![".go".to_string()]);
        let report = collect_annotations(&scope, &AnnotationPattern::default());
        let texts: Vec<&str> = report.annotations.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "third", "second"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn non_utf8_files_are_skipped_not_fatal() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("bin.go");
        fs::write(&path, [0xff, 0xfe, 0x00]).expect("write");
        touch(temp.path(), "ok.go", "// TODO: fine\n");

        let scope = ScanScope::new(temp.path(), vec![".go".to_string()]);
        let report = collect_annotations(&scope, &AnnotationPattern::default());
        assert_eq!(report.annotations.len(), 1);
        assert_eq!(report.skipped.len(), 1);
    }
}
