// src/errors.rs

//! Typed errors for argument parsing.
//!
//! Runtime errors inside a supervisor instance use `anyhow`; the
//! parser has its own enum because the driver must distinguish "help
//! requested" (clean exit) from real configuration errors (exit 1).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// `-h`/`-help` was passed. Carries the usage text to print; the
    /// driver exits 0.
    #[error("help requested")]
    Help(&'static str),

    #[error("flag provided but not defined: -{0}")]
    UnknownFlag(String),

    #[error("bad flag syntax: {0}")]
    BadFlagSyntax(String),

    #[error("flag needs an argument: -{0}")]
    MissingValue(String),

    #[error("-{flag}: {message}")]
    BadValue { flag: String, message: String },

    #[error("run: package not provided")]
    MissingPackage,

    #[error("run accepts a single command, found \"::\"")]
    RunChainSeparator,

    #[error("no command provided")]
    EmptyCommand,

    #[error("empty command in chain")]
    EmptyChainCommand,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error from one instance of a multi-instance
    /// invocation, labelled `[wgo]`, `[wgo2]`, ….
    #[error("[{label}] {source}")]
    Instance {
        label: String,
        #[source]
        source: Box<CliError>,
    },
}

impl CliError {
    /// The usage text to print when this error (possibly wrapped in an
    /// instance label) is a help request.
    pub fn help_text(&self) -> Option<&'static str> {
        match self {
            CliError::Help(text) => Some(text),
            CliError::Instance { source, .. } => source.help_text(),
            _ => None,
        }
    }

    pub(crate) fn for_instance(self, label: &str) -> CliError {
        CliError::Instance {
            label: label.to_string(),
            source: Box::new(self),
        }
    }
}
