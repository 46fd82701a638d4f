// src/supervisor.rs

//! The supervisor instance: one watcher, one command chain, one
//! restart loop.
//!
//! The engine is a selector racing four event sources: cancellation
//! from the driver, exit of the current child, watch events, and the
//! debounce deadline. At most one child is alive at any moment, and a
//! restart always tree-kills and reaps the previous child before the
//! next pass begins.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use notify::RecommendedWatcher;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::logging::EventLog;
use crate::platform;
use crate::spec::SupervisorSpec;
use crate::stdio::{InputSource, OutputSink};
use crate::watch::poller::PollTree;
use crate::watch::{self, matcher, registrar, WatchEvent, WatchOp};

/// Placeholder wake-up used while the debounce timer is idle; the
/// timer branch is disabled then, so the value is never reached.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

/// Outcome of one pass over the command chain.
enum Pass {
    /// The debounce timer fired: kill, reap, run the chain again.
    Restart,
    /// The chain stopped (last command exited, or a mid-chain command
    /// failed); wait for the next change.
    Suspend,
    /// Soft cancellation: the instance is done.
    Cancelled,
    /// `-exit` was set and the last command exited.
    Done(Result<()>),
}

/// Outcome of waiting while no child runs.
enum Wait {
    Restart,
    Cancelled,
}

/// One running supervisor instance. Owns its watcher (or poll tree),
/// its debounce state and its current child.
pub struct Supervisor {
    spec: Arc<SupervisorSpec>,
    cancel: CancellationToken,
    log: EventLog,
    stdout: OutputSink,
    stderr: OutputSink,
    stdin: InputSource,
    event_tx: UnboundedSender<WatchEvent>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    watcher: Option<RecommendedWatcher>,
    deadline: Option<Instant>,
}

impl Supervisor {
    /// Build an instance for `spec`. `cancel` is the driver's (child)
    /// token; cancelling it makes the instance kill its child, release
    /// its watcher and return cleanly.
    pub fn new(spec: SupervisorSpec, cancel: CancellationToken) -> Self {
        let log = EventLog::for_spec(&spec);
        let (event_tx, events) = mpsc::unbounded_channel();
        Self {
            spec: Arc::new(spec),
            cancel,
            log,
            stdout: OutputSink::Inherit,
            stderr: OutputSink::Inherit,
            stdin: InputSource::Inherit,
            event_tx,
            events,
            watcher: None,
            deadline: None,
        }
    }

    /// Replace the children's stdout sink.
    pub fn with_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    /// Replace the children's stderr sink.
    pub fn with_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = sink;
        self
    }

    /// Replace the stdin source used for the last chain command when
    /// `enable_stdin` is set.
    pub fn with_stdin(mut self, source: InputSource) -> Self {
        self.stdin = source;
        self
    }

    /// A sender into this instance's event stream, for synthetic
    /// events.
    pub fn event_sender(&self) -> UnboundedSender<WatchEvent> {
        self.event_tx.clone()
    }

    /// Run the instance to completion.
    ///
    /// Returns `Ok(())` on soft cancellation or, with `exit_when_done`,
    /// when the last command exits zero; the command's failure becomes
    /// the instance's error. Start failures (unspawnable command, no
    /// shell for the fallback) are fatal to the instance.
    pub async fn run(mut self) -> Result<()> {
        for root in &self.spec.roots {
            if !root.is_absolute() {
                bail!("root {} is not an absolute path", root.display());
            }
        }
        let _cleanup = self.spec.executable_path.clone().map(TempBinary);

        if let Some(interval) = self.spec.poll {
            for root in self.spec.roots.iter() {
                self.log
                    .line(format!("POLL {}", root.to_string_lossy().replace('\\', "/")));
                PollTree::spawn(
                    Arc::clone(&self.spec),
                    root.clone(),
                    interval,
                    self.event_tx.clone(),
                    self.cancel.child_token(),
                    self.log.clone(),
                );
            }
        } else {
            let mut watcher = watch::new_watcher(self.event_tx.clone())?;
            let roots = self.spec.roots.clone();
            for root in &roots {
                registrar::add_dirs_recursively(&mut watcher, &self.spec, &self.log, root);
            }
            self.watcher = Some(watcher);
        }

        let mut first_pass = true;
        loop {
            if std::mem::take(&mut first_pass) && self.spec.postpone {
                if let Wait::Cancelled = self.wait_for_change().await {
                    return Ok(());
                }
            }
            match self.run_chain().await? {
                Pass::Restart => {}
                Pass::Cancelled => return Ok(()),
                Pass::Done(result) => return result,
                Pass::Suspend => {
                    if let Wait::Cancelled = self.wait_for_change().await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Execute the chain once, reacting to events while children run.
    async fn run_chain(&mut self) -> Result<Pass> {
        let chain = self.spec.command_chain.clone();
        if chain.is_empty() {
            bail!("empty command chain");
        }
        let last = chain.len() - 1;
        for (index, argv) in chain.iter().enumerate() {
            let is_last = index == last;
            let mut child = self.start_child(argv, is_last)?;
            loop {
                let armed = self.deadline.is_some();
                let wake = self
                    .deadline
                    .unwrap_or_else(|| Instant::now() + IDLE_WAKE);
                // Polled in order: cancellation beats a pending child
                // exit, and a pending event postpones the timer.
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        stop_and_reap(&mut child).await;
                        return Ok(Pass::Cancelled);
                    }
                    status = child.wait() => {
                        let success = matches!(&status, Ok(s) if s.success());
                        if is_last {
                            if self.spec.exit_when_done {
                                return Ok(Pass::Done(exit_result(status)));
                            }
                            return Ok(Pass::Suspend);
                        }
                        if success {
                            break;
                        }
                        return Ok(Pass::Suspend);
                    }
                    event = self.events.recv() => {
                        if let Some(event) = event {
                            self.handle_event(event).await;
                        }
                    }
                    _ = time::sleep_until(wake), if armed => {
                        self.deadline = None;
                        stop_and_reap(&mut child).await;
                        return Ok(Pass::Restart);
                    }
                }
            }
        }
        bail!("command chain ended unexpectedly")
    }

    /// Wait with no child running until the debounce timer fires.
    async fn wait_for_change(&mut self) -> Wait {
        loop {
            let armed = self.deadline.is_some();
            let wake = self
                .deadline
                .unwrap_or_else(|| Instant::now() + IDLE_WAKE);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Wait::Cancelled,
                event = self.events.recv() => {
                    if let Some(event) = event {
                        self.handle_event(event).await;
                    }
                }
                _ = time::sleep_until(wake), if armed => {
                    self.deadline = None;
                    return Wait::Restart;
                }
            }
        }
    }

    /// Process one watch event: enrol new directories, arm the
    /// debounce timer on a matching file.
    async fn handle_event(&mut self, event: WatchEvent) {
        // A path that cannot be stat'ed (already gone again) is not an
        // event worth reacting to.
        let meta = match tokio::fs::metadata(&event.path).await {
            Ok(meta) => meta,
            Err(err) => {
                debug!(path = %event.path.display(), error = %err, "dropping unstat-able event");
                return;
            }
        };
        if meta.is_dir() {
            if event.op == WatchOp::Create && self.spec.poll.is_none() {
                if let Some(watcher) = self.watcher.as_mut() {
                    registrar::add_dirs_recursively(watcher, &self.spec, &self.log, &event.path);
                }
            }
            return;
        }
        if matcher::matches(&self.spec, &self.log, event.op.label(), &event.path) {
            self.deadline = Some(Instant::now() + self.spec.debounce);
        }
    }

    /// Spawn one chain command in its own process group, falling back
    /// to the default shell when the program is not on PATH.
    fn start_child(&self, argv: &[String], is_last: bool) -> Result<Child> {
        let resolved = resolve_argv(argv)?;
        self.log.line(format!("EXECUTING {}", resolved.join(" ")));
        let (program, args) = resolved.split_first().context("empty command")?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.spec.cwd_override {
            cmd.current_dir(dir);
        }
        if !self.spec.env.is_empty() {
            cmd.env_clear();
            for entry in &self.spec.env {
                match entry.split_once('=') {
                    Some((key, value)) => {
                        cmd.env(key, value);
                    }
                    None => {
                        cmd.env(entry, "");
                    }
                }
            }
        }
        cmd.stdout(self.stdout.stdio());
        cmd.stderr(self.stderr.stdio());
        let wire_stdin = self.spec.enable_stdin && is_last;
        if wire_stdin {
            cmd.stdin(self.stdin.stdio());
        } else {
            cmd.stdin(Stdio::null());
        }
        platform::process_group(&mut cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("starting {program}"))?;
        if wire_stdin {
            self.stdin.attach(&mut child);
        }
        self.stdout.attach_stdout(&mut child);
        self.stderr.attach_stderr(&mut child);
        Ok(child)
    }
}

/// Rewrite an argv whose program is neither a path nor on PATH into a
/// default-shell invocation of the quoted command line.
fn resolve_argv(argv: &[String]) -> Result<Vec<String>> {
    let program = argv.first().context("empty command")?;
    if program.chars().any(std::path::is_separator) || platform::lookup_path(program).is_some() {
        return Ok(argv.to_vec());
    }
    let shell = platform::lookup_path(platform::SHELL)
        .with_context(|| format!("{} not found in PATH", platform::SHELL))?;
    Ok(vec![
        shell.to_string_lossy().into_owned(),
        platform::SHELL_FLAG.to_string(),
        platform::quote_argv(argv),
    ])
}

/// Tree-kill the child, then reap it. Restart and cancellation both
/// come through here, so no pass starts while descendants of the
/// previous one are alive.
async fn stop_and_reap(child: &mut Child) {
    platform::tree_kill(child);
    if let Err(err) = child.wait().await {
        warn!(error = %err, "failed to reap child process");
    }
}

fn exit_result(status: std::io::Result<ExitStatus>) -> Result<()> {
    let status = status.context("waiting for command")?;
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(anyhow!("exit status {code}")),
        None => Err(anyhow!("command terminated by signal")),
    }
}

/// Removes the run-mode binary when the instance exits. Best effort; a
/// leftover after a crash is tolerated.
struct TempBinary(PathBuf);

impl Drop for TempBinary {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
