// src/watch/matcher.rs

//! The include/exclude decision for event paths and directories.
//!
//! All patterns are matched against forward-slash root-relative paths.
//! When a path sits under several roots, the first root in declaration
//! order wins. The decision depends only on the path and the spec,
//! never on filesystem content.

use std::path::{Path, PathBuf};

use crate::logging::EventLog;
use crate::spec::SupervisorSpec;

/// Directory basenames that are never watched unless explicitly
/// included with `-dir`.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".settings",
    "node_modules",
];

/// The root-relative, forward-slash form of `path`.
///
/// Falls back to the slash-normalised absolute path when no root is a
/// prefix.
pub fn rel_path(roots: &[PathBuf], path: &Path) -> String {
    for root in roots {
        if let Ok(rel) = path.strip_prefix(root) {
            if rel.as_os_str().is_empty() {
                continue;
            }
            return slash(rel);
        }
    }
    slash(path)
}

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Decide whether a file event at `path` should trigger a restart.
///
/// `op` is only used for the verbose log line. Exclusions always win
/// over inclusions; directory rules are evaluated before file rules.
pub fn matches(spec: &SupervisorSpec, log: &EventLog, op: &str, path: &Path) -> bool {
    let file = rel_path(&spec.roots, path);
    let dir = match file.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    };

    for r in &spec.dir_excludes {
        if r.is_match(&dir) {
            log.line(format!("(skip) {op} {file}"));
            return false;
        }
    }
    if !spec.dir_includes.is_empty() && !spec.dir_includes.iter().any(|r| r.is_match(&dir)) {
        log.line(format!("(skip) {op} {file}"));
        return false;
    }
    for r in &spec.file_excludes {
        if r.is_match(&file) {
            log.line(format!("(skip) {op} {file}"));
            return false;
        }
    }
    if spec.file_includes.iter().any(|r| r.is_match(&file)) {
        log.line(format!("{op} {file}"));
        return true;
    }
    if spec.is_run_mode {
        // Default run-mode filter: sources of the build tool, tests
        // excluded.
        if file.ends_with(".go") && !file.ends_with("_test.go") {
            log.line(format!("{op} {file}"));
            return true;
        }
        log.line(format!("(skip) {op} {file}"));
        return false;
    }
    if spec.file_includes.is_empty() {
        log.line(format!("{op} {file}"));
        return true;
    }
    log.line(format!("(skip) {op} {file}"));
    false
}

/// Decide whether a non-root directory should be watched (and its
/// subtree traversed).
pub fn dir_watchable(spec: &SupervisorSpec, dir: &Path) -> bool {
    let rel = rel_path(&spec.roots, dir);
    if spec.dir_excludes.iter().any(|r| r.is_match(&rel)) {
        return false;
    }
    if spec.dir_includes.iter().any(|r| r.is_match(&rel)) {
        return true;
    }
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if SKIP_DIRS.contains(&name.as_str()) {
        return false;
    }
    if name.starts_with('.') {
        return false;
    }
    true
}
