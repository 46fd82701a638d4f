// src/signals.rs

//! Two-phase interrupt handling.
//!
//! The first SIGINT/SIGTERM cancels the root token so every instance
//! can tree-kill its child and unwind; a second signal exits the
//! process immediately with status 1.

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Install the interrupt handler. Must run inside the runtime.
pub fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = interrupts(cancel).await {
            warn!(error = %err, "failed to listen for interrupt signals");
        }
    });
}

#[cfg(unix)]
async fn interrupts(cancel: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    cancel.cancel();

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    std::process::exit(1);
}

#[cfg(not(unix))]
async fn interrupts(cancel: CancellationToken) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    cancel.cancel();
    tokio::signal::ctrl_c().await?;
    std::process::exit(1);
}
