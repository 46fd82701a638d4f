// src/watch/poller.rs

//! Polling fallback for filesystems without usable change
//! notifications (network mounts, some containers).
//!
//! One task polls each directory and each file. Directory pollers
//! re-list their entries every interval: new entries synthesise a
//! *create* event and get a poller of their own, vanished entries have
//! their poller cancelled through a per-entry child token. File
//! pollers report a *modify* event when mtime or size changes.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::logging::EventLog;
use crate::spec::SupervisorSpec;
use crate::watch::{matcher, WatchEvent, WatchOp};

/// Shared state of one root's polling tree.
pub struct PollTree {
    spec: Arc<SupervisorSpec>,
    interval: Duration,
    tx: UnboundedSender<WatchEvent>,
    log: EventLog,
}

impl PollTree {
    /// Start polling `root` and all directories below it that pass the
    /// filter rules. Cancelling `token` tears the whole tree down.
    pub fn spawn(
        spec: Arc<SupervisorSpec>,
        root: PathBuf,
        interval: Duration,
        tx: UnboundedSender<WatchEvent>,
        token: CancellationToken,
        log: EventLog,
    ) {
        let tree = Arc::new(Self {
            spec,
            interval,
            tx,
            log,
        });
        tokio::spawn(tree.poll_directory(root, token));
    }

    // Boxed because the future recurses through spawned children.
    fn poll_directory(
        self: Arc<Self>,
        dir: PathBuf,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            // Tokens per entry name; cancelled when the entry vanishes.
            let mut entries: HashMap<OsString, CancellationToken> = HashMap::new();

            let mut listing = match tokio::fs::read_dir(&dir).await {
                Ok(listing) => listing,
                Err(err) => {
                    self.log.line(err.to_string());
                    return;
                }
            };
            while let Ok(Some(entry)) = listing.next_entry().await {
                let child = token.child_token();
                entries.insert(entry.file_name(), child.clone());
                let path = entry.path();
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|t| t.is_dir())
                    .unwrap_or(false);
                if is_dir {
                    if matcher::dir_watchable(&self.spec, &path) {
                        self.log
                            .line(format!("POLL {}", matcher::rel_path(&self.spec.roots, &path)));
                        tokio::spawn(Arc::clone(&self).poll_directory(path, child));
                    }
                } else {
                    tokio::spawn(Arc::clone(&self).poll_file(path, child));
                }
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(self.interval) => {}
                }

                let mut listing = match tokio::fs::read_dir(&dir).await {
                    Ok(listing) => listing,
                    Err(_) => continue,
                };
                let mut seen: HashSet<OsString> = HashSet::new();
                while let Ok(Some(entry)) = listing.next_entry().await {
                    let name = entry.file_name();
                    seen.insert(name.clone());
                    if entries.contains_key(&name) {
                        continue;
                    }
                    let child = token.child_token();
                    entries.insert(name, child.clone());
                    let path = entry.path();
                    if self
                        .tx
                        .send(WatchEvent {
                            op: WatchOp::Create,
                            path: path.clone(),
                        })
                        .is_err()
                    {
                        debug!("event receiver dropped, stopping directory poller");
                        return;
                    }
                    let is_dir = entry
                        .file_type()
                        .await
                        .map(|t| t.is_dir())
                        .unwrap_or(false);
                    if is_dir {
                        tokio::spawn(Arc::clone(&self).poll_directory(path, child));
                    } else {
                        tokio::spawn(Arc::clone(&self).poll_file(path, child));
                    }
                }
                entries.retain(|name, entry_token| {
                    if seen.contains(name) {
                        true
                    } else {
                        entry_token.cancel();
                        false
                    }
                });
            }
        })
    }

    async fn poll_file(self: Arc<Self>, path: PathBuf, token: CancellationToken) {
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(_) => return,
        };
        let mut last = (meta.modified().ok(), meta.len());
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
            let meta = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            let current = (meta.modified().ok(), meta.len());
            if current != last
                && self
                    .tx
                    .send(WatchEvent {
                        op: WatchOp::Modify,
                        path: path.clone(),
                    })
                    .is_err()
            {
                return;
            }
            last = current;
        }
    }
}
