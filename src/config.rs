/// Longest accepted input line in bytes. Reaching it is a fatal read error.
pub const MAX_LINE: usize = 1024;

/// Argument slots per command line. Tokens beyond `MAX_ARGS - 1` are dropped.
pub const MAX_ARGS: usize = 128;

pub const PROMPT: &str = "[redirsh]$ ";

/// Status recorded for a command whose program could not be executed.
pub const EXIT_EXEC_FAILURE: i32 = 127;

/// Status recorded for a command whose standard streams could not be wired.
/// Kept apart from 1 so it is not mistaken for an ordinary program failure.
pub const EXIT_SETUP_FAILURE: i32 = 126;
