// src/watch/mod.rs

//! File watching: event conversion, directory enrolment, polling.
//!
//! This module turns filesystem activity into a single stream of
//! [`WatchEvent`]s per instance, produced either by a `notify` watcher
//! (directories enrolled one by one under the registrar's filter
//! rules) or by the polling tree. It knows nothing about commands or
//! restarts; the supervisor consumes the stream.

pub mod matcher;
pub mod patterns;
pub mod poller;
pub mod registrar;

use std::path::PathBuf;

use anyhow::Result;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

pub use patterns::compile_pattern;

/// The two event kinds that can trigger a restart. Everything else
/// (removes, renames, attribute changes) is dropped at conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOp {
    Create,
    Modify,
}

impl WatchOp {
    /// Name used in verbose log lines.
    pub fn label(self) -> &'static str {
        match self {
            WatchOp::Create => "CREATE",
            WatchOp::Modify => "WRITE",
        }
    }
}

/// One filesystem event as seen by the supervisor.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub op: WatchOp,
    pub path: PathBuf,
}

/// Create a filesystem watcher that forwards converted events into
/// `tx`.
///
/// The returned watcher starts with no registrations; the caller
/// enrols directories through [`registrar::add_dirs_recursively`].
/// Dropping it stops delivery. Watcher errors are logged and do not
/// tear anything down.
pub fn new_watcher(tx: UnboundedSender<WatchEvent>) -> Result<RecommendedWatcher> {
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let op = match classify(&event.kind) {
                    Some(op) => op,
                    None => return,
                };
                for path in event.paths {
                    if tx.send(WatchEvent { op, path }).is_err() {
                        debug!("event receiver dropped, discarding watch event");
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;
    Ok(watcher)
}

fn classify(kind: &EventKind) -> Option<WatchOp> {
    match kind {
        EventKind::Create(_) => Some(WatchOp::Create),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(WatchOp::Modify)
        }
        _ => None,
    }
}
