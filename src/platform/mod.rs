// src/platform/mod.rs

//! Platform primitives: process groups, tree-kill, shell quoting and
//! PATH lookup.
//!
//! The supervisor owns child *trees*, not single processes, so the two
//! process primitives here come with a strict contract: children start
//! as group leaders ([`process_group`]) and are terminated together
//! with all their descendants ([`tree_kill`]).

pub mod quote;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{process_group, tree_kill, SHELL, SHELL_FLAG};
#[cfg(windows)]
pub use windows::{process_group, tree_kill, SHELL, SHELL_FLAG};

pub use quote::quote_argv;

use std::path::PathBuf;

/// Resolve a bare program name against PATH.
///
/// Returns `None` when the name is not present as an executable file
/// in any PATH entry. Names containing a path separator are not
/// resolved here; callers run those directly.
pub fn lookup_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in candidates(&dir, name) {
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(unix)]
fn candidates(dir: &std::path::Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(windows)]
fn candidates(dir: &std::path::Path, name: &str) -> Vec<PathBuf> {
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    let mut out = vec![dir.join(name)];
    for ext in exts.split(';').filter(|e| !e.is_empty()) {
        out.push(dir.join(format!("{name}{ext}")));
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(windows)]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}
