// src/watch/registrar.rs

//! Recursive directory enrolment for the event-driven watcher.

use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;
use walkdir::WalkDir;

use crate::logging::EventLog;
use crate::spec::SupervisorSpec;
use crate::watch::matcher;

/// Walk `dir` and register every directory that passes the filter
/// rules, pruning excluded subtrees.
///
/// Roots are always registered regardless of the rules; every other
/// directory goes through [`matcher::dir_watchable`]. Directories are
/// added `NonRecursive` so the filter decides the shape of the watched
/// tree. Also called when a *create* event delivers a brand-new
/// directory. Walk and registration errors are best-effort: a
/// disappearing entry must not take the instance down.
pub fn add_dirs_recursively(
    watcher: &mut RecommendedWatcher,
    spec: &SupervisorSpec,
    log: &EventLog,
    dir: &Path,
) {
    let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        entry.file_type().is_dir()
            && (spec.roots.iter().any(|root| root == entry.path())
                || matcher::dir_watchable(spec, entry.path()))
    });
    for entry in walker.flatten() {
        let path = entry.path();
        let shown = if spec.roots.iter().any(|root| root == path) {
            path.to_string_lossy().replace('\\', "/")
        } else {
            matcher::rel_path(&spec.roots, path)
        };
        log.line(format!("WATCH {shown}"));
        if let Err(err) = watcher.watch(path, RecursiveMode::NonRecursive) {
            debug!(path = %path.display(), error = %err, "failed to watch directory");
        }
    }
}
