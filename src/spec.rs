// src/spec.rs

//! The immutable configuration for one supervisor instance.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

/// Default debounce window for file events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Configuration for a single supervisor instance.
///
/// Built once by the argument parser (or directly by embedders and
/// tests) and never mutated afterwards. Every root is absolute, the
/// chain is non-empty and every argv in it is non-empty.
#[derive(Debug, Clone)]
pub struct SupervisorSpec {
    /// Directories to watch. Earlier roots take precedence when
    /// computing the root-relative form of an event path.
    pub roots: Vec<PathBuf>,

    /// File patterns to include, matched against the forward-slash
    /// root-relative path. OR-ed together. When empty, every file is
    /// included unless excluded.
    pub file_includes: Vec<Regex>,

    /// File patterns to exclude. Take precedence over includes.
    pub file_excludes: Vec<Regex>,

    /// Directory patterns to include, matched against the
    /// forward-slash root-relative path of a file's parent directory.
    pub dir_includes: Vec<Regex>,

    /// Directory patterns to exclude. Take precedence over includes
    /// and prune whole subtrees from watching.
    pub dir_excludes: Vec<Regex>,

    /// The command chain: each entry is one argv, executed in order,
    /// short-circuiting on non-zero exit.
    pub command_chain: Vec<Vec<String>>,

    /// Working directory for the commands; `None` inherits.
    pub cwd_override: Option<PathBuf>,

    /// `KEY=VALUE` entries. Empty means the children inherit the
    /// invoker's environment; non-empty replaces it wholesale.
    pub env: Vec<String>,

    /// Quiet interval after the last matching event before a restart.
    pub debounce: Duration,

    /// Poll interval. `None` uses the OS filesystem watcher.
    pub poll: Option<Duration>,

    /// Exit the instance when the last command in the chain exits.
    pub exit_when_done: bool,

    /// Attach the invoker's stdin to the last command in the chain.
    pub enable_stdin: bool,

    /// Log watch/event lines to stderr.
    pub verbose: bool,

    /// Postpone the first run of the chain until a file changes.
    pub postpone: bool,

    /// Whether this spec came from the `run` subcommand. Changes the
    /// default file filter to `.go`-and-not-`_test.go`.
    pub is_run_mode: bool,

    /// Output path of the synthesised build command in run mode,
    /// removed (best effort) when the instance exits.
    pub executable_path: Option<PathBuf>,

    /// Instance label used in log prefixes and error messages:
    /// `wgo`, `wgo2`, `wgo3`, …
    pub label: String,
}

impl SupervisorSpec {
    /// A spec watching `root` with an empty chain and defaults
    /// everywhere else. The parser fills in the rest.
    pub fn new(root: PathBuf, label: String) -> Self {
        Self {
            roots: vec![root],
            file_includes: Vec::new(),
            file_excludes: Vec::new(),
            dir_includes: Vec::new(),
            dir_excludes: Vec::new(),
            command_chain: Vec::new(),
            cwd_override: None,
            env: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
            poll: None,
            exit_when_done: false,
            enable_stdin: false,
            verbose: false,
            postpone: false,
            is_run_mode: false,
            executable_path: None,
            label,
        }
    }
}
