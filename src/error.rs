use std::io;

use thiserror::Error;

/// Everything that can go wrong while turning a line into a running program.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("syntax error near '{operator}'")]
    Syntax { operator: String },

    #[error("syntax error: no command to run")]
    EmptyCommand,

    #[error("'{path}' is a directory")]
    TargetIsDirectory { path: String },

    #[error("{path}: No such file or directory")]
    InputNotFound { path: String },

    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("dup {stream}: {source}")]
    Install {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("fork: {0}")]
    Fork(#[source] io::Error),

    #[error("wait: {0}")]
    Wait(#[source] io::Error),

    #[error("input line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

impl ShellError {
    /// Fatal errors end the interpreter; the rest only abort the current line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::LineTooLong { .. })
    }
}

/// Prints a diagnostic for `err` on standard error.
pub fn report(err: &ShellError) {
    eprintln!("redirsh: {err}");
}
