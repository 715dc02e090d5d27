//! Worklist discovery.
//!
//! Walks each configured root, keeps files with a recognized extension and
//! drops every path the ledger already knows. Within a directory, files are
//! visited before subdirectories and both in name order, so two runs over
//! the same tree see the same worklist.
//!
//! File contents are never compared: a file edited after it was recorded is
//! still considered processed until the ledger is reset.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::{normalize_extension, Config};
use crate::models::Ledger;

/// Result of a scan.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Files on disk and absent from the ledger, in traversal order.
    pub new_files: Vec<PathBuf>,
    /// Matching files skipped because the ledger already has them.
    pub already_processed: usize,
}

pub struct Discoverer {
    extensions: HashSet<String>,
    output_dir_name: String,
    exclude_set: GlobSet,
}

impl Discoverer {
    pub fn new(
        extensions: &[String],
        output_dir_name: &str,
        exclude_globs: &[String],
    ) -> Result<Self> {
        let mut excludes = vec!["**/.git/**".to_string()];
        excludes.extend(exclude_globs.iter().cloned());
        Ok(Self {
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            output_dir_name: output_dir_name.to_string(),
            exclude_set: build_globset(&excludes)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.extensions,
            &config.output.dir_name,
            &config.exclude_globs,
        )
    }

    /// Lists files under `roots` that are not yet in `ledger`.
    pub fn scan(&self, roots: &[PathBuf], ledger: &Ledger) -> Result<Discovery> {
        let mut discovery = Discovery::default();
        let mut seen = HashSet::new();

        for root in roots {
            let root = std::path::absolute(root)?;
            if !root.is_dir() {
                tracing::warn!(root = %root.display(), "folder does not exist, skipping");
                continue;
            }

            let walker = WalkDir::new(&root)
                .sort_by(files_before_dirs)
                .into_iter()
                .filter_entry(|e| !self.is_excluded_dir(&root, e));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(error = %e, "cannot read directory entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !self.is_recognized(entry.path()) {
                    continue;
                }

                let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                if self.exclude_set.is_match(rel) {
                    continue;
                }

                let path = entry.into_path();
                let key = ledger_key(&path);
                if !seen.insert(key.clone()) {
                    continue;
                }
                if ledger.contains_key(&key) {
                    tracing::debug!(file = %path.display(), "already processed");
                    discovery.already_processed += 1;
                    continue;
                }
                discovery.new_files.push(path);
            }
        }

        Ok(discovery)
    }

    fn is_recognized(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| self.extensions.contains(&e.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }

    fn is_excluded_dir(&self, root: &Path, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            return false;
        }
        if entry.file_name() == self.output_dir_name.as_str() {
            return true;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        // Globs like `**/drafts/**` need a trailing component to match the directory itself.
        self.exclude_set.is_match(rel) || self.exclude_set.is_match(rel.join("x"))
    }
}

/// The ledger key for a file: its absolute path as a string.
pub fn ledger_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn files_before_dirs(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentRecord;
    use std::fs;
    use tempfile::TempDir;

    fn discoverer(excludes: &[&str]) -> Discoverer {
        let exts: Vec<String> = ["txt", "docx", "pdf", "pptx"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
        Discoverer::new(&exts, "analyzer", &excludes).unwrap()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn files_come_before_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let root = std::path::absolute(tmp.path()).unwrap();
        touch(&root.join("b.txt"));
        touch(&root.join("a/inner.pdf"));
        touch(&root.join("c.docx"));
        touch(&root.join("a/z/deep.txt"));
        touch(&root.join("a/first.txt"));

        let found = discoverer(&[]).scan(&[root.clone()], &Ledger::new()).unwrap();
        assert_eq!(
            names(&found.new_files, &root),
            vec!["b.txt", "c.docx", "a/first.txt", "a/inner.pdf", "a/z/deep.txt"]
        );
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let root = std::path::absolute(tmp.path()).unwrap();
        touch(&root.join("UPPER.PDF"));
        touch(&root.join("notes.md"));
        touch(&root.join("image.png"));

        let found = discoverer(&[]).scan(&[root.clone()], &Ledger::new()).unwrap();
        assert_eq!(names(&found.new_files, &root), vec!["UPPER.PDF"]);
    }

    #[test]
    fn output_folder_is_never_scanned() {
        let tmp = TempDir::new().unwrap();
        let root = std::path::absolute(tmp.path()).unwrap();
        touch(&root.join("analyzer/analysis-docs.docx"));
        touch(&root.join("sub/analyzer/old.txt"));
        touch(&root.join("keep.txt"));

        let found = discoverer(&[]).scan(&[root.clone()], &Ledger::new()).unwrap();
        assert_eq!(names(&found.new_files, &root), vec!["keep.txt"]);
    }

    #[test]
    fn ledgered_files_are_subtracted() {
        let tmp = TempDir::new().unwrap();
        let root = std::path::absolute(tmp.path()).unwrap();
        touch(&root.join("done.txt"));
        touch(&root.join("todo.txt"));

        let mut ledger = Ledger::new();
        ledger.insert(
            ledger_key(&root.join("done.txt")),
            DocumentRecord {
                processed_at: chrono::Local::now().naive_local(),
                title: None,
                author: None,
                analysis: None,
            },
        );

        let found = discoverer(&[]).scan(&[root.clone()], &ledger).unwrap();
        assert_eq!(names(&found.new_files, &root), vec!["todo.txt"]);
        assert_eq!(found.already_processed, 1);
    }

    #[test]
    fn exclude_globs_prune_directories() {
        let tmp = TempDir::new().unwrap();
        let root = std::path::absolute(tmp.path()).unwrap();
        touch(&root.join("drafts/wip.txt"));
        touch(&root.join("final.txt"));

        let found = discoverer(&["drafts/**"])
            .scan(&[root.clone()], &Ledger::new())
            .unwrap();
        assert_eq!(names(&found.new_files, &root), vec!["final.txt"]);
    }

    #[test]
    fn missing_root_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let found = discoverer(&[])
            .scan(&[tmp.path().join("gone")], &Ledger::new())
            .unwrap();
        assert!(found.new_files.is_empty());
    }

    #[test]
    fn overlapping_roots_yield_each_file_once() {
        let tmp = TempDir::new().unwrap();
        let root = std::path::absolute(tmp.path()).unwrap();
        touch(&root.join("sub/a.txt"));

        let found = discoverer(&[])
            .scan(&[root.clone(), root.join("sub")], &Ledger::new())
            .unwrap();
        assert_eq!(found.new_files.len(), 1);
    }
}
