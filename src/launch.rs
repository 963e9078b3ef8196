use std::io;
use std::os::fd::AsFd;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::debug;

use crate::config::{EXIT_EXEC_FAILURE, EXIT_SETUP_FAILURE};
use crate::error::{ShellError, report};
use crate::redirection::{OpenStreams, Redirections};

/// A launched command, waiting to be reaped.
#[derive(Debug)]
pub enum Launched {
    Running(Child),
    /// The command never got as far as running its program.
    Failed(ExitStatus),
}

impl Launched {
    /// Blocks until the command has terminated.
    pub fn reap(self) -> io::Result<ExitStatus> {
        match self {
            Launched::Running(mut child) => child.wait(),
            Launched::Failed(status) => Ok(status),
        }
    }
}

/// Starts `args[0]` with `args[1..]`, streams wired per `redirections`.
///
/// Opening a target fails the line. Failing to wire a stream or to execute
/// the program is reported here and yields an already-terminated command.
pub fn launch(args: &[&str], redirections: &Redirections) -> Result<Launched, ShellError> {
    let (program, rest) = args.split_first().ok_or(ShellError::EmptyCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(rest);

    if !redirections.is_empty() {
        let streams = redirections.open_streams()?;
        if let Err(err) = rewire(&mut cmd, streams, redirections.merge_stderr) {
            report(&err);
            return Ok(Launched::Failed(status_from_code(EXIT_SETUP_FAILURE)));
        }
    }

    match cmd.spawn() {
        Ok(child) => {
            debug!(pid = child.id(), program, "launched");
            Ok(Launched::Running(child))
        }
        Err(source) if is_resource_exhaustion(&source) => Err(ShellError::Fork(source)),
        Err(source) => {
            report(&ShellError::Exec {
                program: program.to_string(),
                source,
            });
            Ok(Launched::Failed(status_from_code(EXIT_EXEC_FAILURE)))
        }
    }
}

/// Installs opened handles as the command's standard streams.
///
/// With `merge_stderr`, stderr gets a duplicate of whatever stdout ends up
/// as: the redirected file if there is one, our own stdout otherwise.
fn rewire(cmd: &mut Command, streams: OpenStreams, merge_stderr: bool) -> Result<(), ShellError> {
    let OpenStreams {
        stdin,
        stdout,
        stderr,
    } = streams;

    if let Some(file) = stdin {
        cmd.stdin(Stdio::from(file));
    }

    let merged = if merge_stderr {
        let dup = match &stdout {
            Some(file) => file.try_clone().map(Stdio::from),
            None => io::stdout().as_fd().try_clone_to_owned().map(Stdio::from),
        };
        Some(dup.map_err(|source| ShellError::Install {
            stream: "stderr",
            source,
        })?)
    } else {
        None
    };

    if let Some(file) = stdout {
        cmd.stdout(Stdio::from(file));
    }

    match merged {
        Some(stdio) => {
            cmd.stderr(stdio);
        }
        None => {
            if let Some(file) = stderr {
                cmd.stderr(Stdio::from(file));
            }
        }
    }
    Ok(())
}

fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory
    )
}

fn status_from_code(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}
