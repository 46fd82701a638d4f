use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, EnvFilter};

use wgo::spec::SupervisorSpec;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing**
///   tests (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g. `WGO_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("WGO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .init();
    });
}

/// A spec watching `root` and running `chain`, defaults elsewhere.
pub fn spec_with_chain(root: &Path, chain: &[&[&str]]) -> SupervisorSpec {
    let mut spec = SupervisorSpec::new(root.to_path_buf(), "wgo".to_string());
    spec.command_chain = chain
        .iter()
        .map(|argv| argv.iter().map(|s| s.to_string()).collect())
        .collect();
    spec
}

/// Poll `pred` every 25ms until it returns true or `timeout` elapses.
pub async fn wait_until<F: FnMut() -> bool>(mut pred: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Number of times `needle` occurs in the file at `path` (0 if the
/// file does not exist yet).
pub fn count_in_file(path: &PathBuf, needle: &str) -> usize {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents.matches(needle).count(),
        Err(_) => 0,
    }
}
