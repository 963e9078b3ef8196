use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use tracing::{debug, trace, warn};

use crate::builtins;
use crate::config::MAX_LINE;
use crate::error::ShellError;
use crate::launch::launch;
use crate::redirection::parse_command;
use crate::tokenize::tokenize;

/// What one command line amounted to.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to run.
    Idle,
    /// `exit` was requested with this status.
    Exit(i32),
    /// A command was launched and has been reaped.
    Completed(ExitStatus),
}

/// Runs one command line to completion.
///
/// Errors abort this line only, unless [`ShellError::is_fatal`] says otherwise.
pub fn execute_line(line: &str) -> Result<Outcome, ShellError> {
    if line.len() >= MAX_LINE {
        return Err(ShellError::LineTooLong { limit: MAX_LINE });
    }

    let tokens = tokenize(line);
    trace!(?tokens, "tokenized");
    if tokens.is_empty() {
        return Ok(Outcome::Idle);
    }

    let parsed = parse_command(&tokens)?;
    debug!(?parsed, "parsed");

    if builtins::is_builtin(parsed.args[0]) {
        return Ok(Outcome::Exit(builtins::exit_status(&parsed.args)));
    }

    parsed.redirections.validate()?;
    let status = launch(&parsed.args, &parsed.redirections)?
        .reap()
        .map_err(ShellError::Wait)?;

    match status.signal() {
        Some(signal) => warn!(signal, "command terminated by signal"),
        None => debug!(code = ?status.code(), "command exited"),
    }
    Ok(Outcome::Completed(status))
}
