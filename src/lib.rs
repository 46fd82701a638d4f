// src/lib.rs

//! wgo: watch directory trees, (re)run command chains when files
//! change.
//!
//! The pieces, leaves first:
//! - [`platform`]: process groups, tree-kill, shell quoting
//! - [`watch`]: pattern compiler, path matcher, registrar, poller
//! - [`cli`]: argv -> [`spec::SupervisorSpec`]s
//! - [`supervisor`]: the per-instance event loop
//! - [`run`]: the driver that fans instances out and aggregates exits

pub mod cli;
pub mod errors;
pub mod logging;
pub mod platform;
pub mod signals;
pub mod spec;
pub mod stdio;
pub mod supervisor;
pub mod watch;

use anyhow::Result;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::supervisor::Supervisor;

/// High-level entry point used by `main.rs`.
///
/// Parses the argv into supervisor specs, installs the two-phase
/// interrupt handler, runs every instance concurrently and waits for
/// all of them. Returns `Ok(true)` when every instance exited cleanly,
/// `Ok(false)` when at least one failed (its error has already been
/// printed to stderr), and `Err` for parse errors. The distinguished
/// help request also arrives as `Err`; the caller turns it into a
/// clean exit.
pub async fn run(args: Vec<String>) -> Result<bool> {
    let specs = cli::parse_commands(&args)?;

    let cancel = CancellationToken::new();
    signals::spawn_interrupt_handler(cancel.clone());

    let mut set = JoinSet::new();
    for spec in specs {
        let instance = Supervisor::new(spec, cancel.child_token());
        set.spawn(instance.run());
    }

    let mut ok = true;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                eprintln!("{err:#}");
                ok = false;
            }
            Err(err) => {
                eprintln!("wgo: supervisor task panicked: {err}");
                ok = false;
            }
        }
    }
    Ok(ok)
}
