// src/platform/unix.rs

//! POSIX process-tree primitives.

use tokio::process::{Child, Command};

/// Make the spawned child the leader of a new process group, so the
/// whole descendant tree can be signalled at once.
pub fn process_group(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Terminate the child and all of its descendants.
///
/// Signals the negative pgid, which reaches every process in the group
/// the child leads. Killing only the child's pid would orphan
/// grandchildren (shell wrappers, build subprocesses), so that is
/// never done here. The caller reaps the child separately.
pub fn tree_kill(child: &Child) {
    if let Some(pid) = child.id() {
        unsafe {
            let _ = libc::kill(-(pid as libc::pid_t), libc::SIGTERM);
        }
    }
}

/// Default shell used for the PATH-lookup fallback.
pub const SHELL: &str = "sh";

/// Flag that makes [`SHELL`] evaluate a command string.
pub const SHELL_FLAG: &str = "-c";
