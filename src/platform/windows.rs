// src/platform/windows.rs

//! Windows process-tree primitives.

use tokio::process::{Child, Command};

/// No-op on Windows; `taskkill /t` walks the tree by pid at kill time.
pub fn process_group(_cmd: &mut Command) {}

/// Terminate the child and all of its descendants via the OS tree-kill
/// utility. The caller reaps the child separately.
pub fn tree_kill(child: &Child) {
    if let Some(pid) = child.id() {
        let _ = std::process::Command::new("taskkill.exe")
            .args(["/t", "/f", "/pid", &pid.to_string()])
            .status();
    }
}

/// Default shell used for the PATH-lookup fallback.
pub const SHELL: &str = "pwsh.exe";

/// Flag that makes [`SHELL`] evaluate a command string.
pub const SHELL_FLAG: &str = "-command";
