mod builtins;
mod config;
mod error;
mod launch;
mod redirection;
mod shell;
mod tokenize;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use crate::config::PROMPT;
use crate::error::report;
use crate::shell::Outcome;

fn main() -> Result<()> {
    init_logging();

    let mut rl = DefaultEditor::new().context("failed to set up line editor")?;
    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err).context("failed to read command line"),
        };
        if !line.trim().is_empty() {
            rl.add_history_entry(line.as_str())?;
        }

        match shell::execute_line(&line) {
            Ok(Outcome::Exit(status)) => {
                println!("Exiting shell with status {status}");
                std::process::exit(status);
            }
            Ok(Outcome::Idle | Outcome::Completed(_)) => {}
            Err(err) => {
                report(&err);
                if err.is_fatal() {
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
