// src/logging.rs

//! Logging setup and the per-instance verbose event stream.
//!
//! Two layers on purpose: internal diagnostics go through `tracing`
//! (filtered by the `WGO_LOG` environment variable, quiet by default),
//! while the `-verbose` flag drives [`EventLog`], whose `[wgo] `-
//! prefixed stderr lines are part of the CLI contract and must not
//! depend on subscriber configuration.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Level comes from `WGO_LOG` (e.g. "debug", "wgo=trace"); defaults to
/// `warn` so normal runs stay silent. Call once at startup.
pub fn init() {
    let filter = EnvFilter::try_from_env("WGO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The user-facing event log of one supervisor instance.
///
/// Disabled unless the instance was started with `-verbose`. Lines go
/// to stderr prefixed with the instance label, e.g. `[wgo2] WATCH src`.
#[derive(Clone, Default)]
pub struct EventLog {
    prefix: Option<Arc<str>>,
}

impl EventLog {
    /// An enabled log with the given instance label.
    pub fn new(label: &str) -> Self {
        Self {
            prefix: Some(format!("[{label}] ").into()),
        }
    }

    /// A log that swallows everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the log for a spec: enabled only when `verbose` is set.
    pub fn for_spec(spec: &crate::spec::SupervisorSpec) -> Self {
        if spec.verbose {
            Self::new(&spec.label)
        } else {
            Self::disabled()
        }
    }

    pub fn enabled(&self) -> bool {
        self.prefix.is_some()
    }

    /// Emit one line, prefix included, if the log is enabled.
    pub fn line(&self, msg: impl AsRef<str>) {
        if let Some(prefix) = &self.prefix {
            eprintln!("{prefix}{}", msg.as_ref());
        }
    }
}
