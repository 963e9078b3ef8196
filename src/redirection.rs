use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;

use tracing::debug;

use crate::config::MAX_ARGS;
use crate::error::ShellError;

/// A file target for one output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirection<'a> {
    pub file: &'a str,
    pub append: bool,
}

/// Every redirection requested on one line. Paths borrow from the line buffer.
///
/// `combined` (`&>`/`>&`) overrides `stdout` and `stderr` whenever it is set;
/// use [`Redirections::output_target`] and [`Redirections::error_target`]
/// rather than reading those fields directly.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Redirections<'a> {
    pub input: Option<&'a str>,
    pub stdout: Option<Redirection<'a>>,
    pub stderr: Option<Redirection<'a>>,
    pub merge_stderr: bool,
    pub combined: Option<&'a str>,
}

/// A parsed command with arguments and redirections.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub args: Vec<&'a str>,
    pub redirections: Redirections<'a>,
}

/// Handles opened for a command's standard streams, not yet installed.
#[derive(Debug, Default)]
pub struct OpenStreams {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
    pub stderr: Option<File>,
}

/// Splits tokens into program arguments and redirections.
///
/// Operators are matched by exact token, so an argument spelled like an
/// operator cannot be passed through to the program. Once `MAX_ARGS - 1`
/// arguments are collected the rest of the line is ignored.
pub fn parse_command<'a>(tokens: &[&'a str]) -> Result<ParsedCommand<'a>, ShellError> {
    let mut args = Vec::new();
    let mut r = Redirections::default();
    let mut tokens = tokens.iter().copied();

    while args.len() < MAX_ARGS - 1 {
        let Some(token) = tokens.next() else {
            break;
        };
        match token {
            "<" => {
                r.input = Some(operand(token, &mut tokens)?);
            }
            ">" | ">>" => {
                r.stdout = Some(Redirection {
                    file: operand(token, &mut tokens)?,
                    append: token == ">>",
                });
            }
            "2>" | "2>>" => {
                r.stderr = Some(Redirection {
                    file: operand(token, &mut tokens)?,
                    append: token == "2>>",
                });
                r.merge_stderr = false;
            }
            // complete on its own, takes no operand
            "2>&1" => {
                r.merge_stderr = true;
                r.stderr = None;
            }
            "&>" | ">&" => {
                r.combined = Some(operand(token, &mut tokens)?);
                r.stdout = None;
                r.stderr = None;
            }
            _ => args.push(token),
        }
    }

    if args.is_empty() {
        return Err(ShellError::EmptyCommand);
    }

    Ok(ParsedCommand {
        args,
        redirections: r,
    })
}

fn operand<'a>(
    operator: &str,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<&'a str, ShellError> {
    tokens.next().ok_or_else(|| ShellError::Syntax {
        operator: operator.to_string(),
    })
}

impl<'a> Redirections<'a> {
    /// True when the line asked for no redirection at all.
    pub fn is_empty(&self) -> bool {
        *self == Redirections::default()
    }

    pub fn output_target(&self) -> Option<Redirection<'a>> {
        match self.combined {
            Some(_) => None,
            None => self.stdout,
        }
    }

    pub fn error_target(&self) -> Option<Redirection<'a>> {
        match self.combined {
            Some(_) => None,
            None => self.stderr,
        }
    }

    /// Checks targets before anything is opened. Opening can still fail later.
    pub fn validate(&self) -> Result<(), ShellError> {
        let outputs = [
            self.output_target().map(|t| t.file),
            self.error_target().map(|t| t.file),
            self.combined,
        ];
        for path in outputs.into_iter().flatten() {
            if fs::metadata(path).is_ok_and(|m| m.is_dir()) {
                debug!(path, "output target is a directory");
                return Err(ShellError::TargetIsDirectory {
                    path: path.to_string(),
                });
            }
        }

        if let Some(path) = self.input {
            match fs::metadata(path) {
                Ok(m) if m.is_dir() => {
                    return Err(ShellError::TargetIsDirectory {
                        path: path.to_string(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(ShellError::InputNotFound {
                        path: path.to_string(),
                    });
                }
                // anything else is left for open to report
                _ => {}
            }
        }
        Ok(())
    }

    /// Opens every target. The first failure closes whatever was already opened.
    pub fn open_streams(&self) -> Result<OpenStreams, ShellError> {
        let mut streams = OpenStreams::default();

        if let Some(path) = self.input {
            streams.stdin = Some(File::open(path).map_err(|e| open_error(path, e))?);
        }

        if let Some(path) = self.combined {
            let file = open_for_write(path, false).map_err(|e| open_error(path, e))?;
            // a dup shares the file offset, so both streams interleave
            streams.stderr = Some(file.try_clone().map_err(|e| open_error(path, e))?);
            streams.stdout = Some(file);
            return Ok(streams);
        }

        if let Some(target) = self.output_target() {
            let file = open_for_write(target.file, target.append)
                .map_err(|e| open_error(target.file, e))?;
            streams.stdout = Some(file);
        }

        if let Some(target) = self.error_target() {
            let file = open_for_write(target.file, target.append)
                .map_err(|e| open_error(target.file, e))?;
            streams.stderr = Some(file);
        }

        Ok(streams)
    }
}

/// Opens a file for writing, creating it if needed.
fn open_for_write(file: &str, append: bool) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .mode(0o644)
        .open(file)
}

fn open_error(path: &str, source: io::Error) -> ShellError {
    ShellError::Open {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn parse(line: &str) -> Result<ParsedCommand<'_>, ShellError> {
        parse_command(&crate::tokenize::tokenize(line))
    }

    #[test]
    fn test_operator_position_does_not_matter() {
        let parsed = parse("> out.txt wc -l").unwrap();
        assert_eq!(parsed.args, vec!["wc", "-l"]);
        assert_eq!(
            parsed.redirections.output_target(),
            Some(Redirection {
                file: "out.txt",
                append: false
            })
        );
    }

    #[test]
    fn test_redirections_do_not_count_toward_argument_cap() {
        let line = format!("echo {} < in.txt > out.txt", vec!["a"; MAX_ARGS - 4].join(" "));
        let parsed = parse(&line).unwrap();
        assert_eq!(parsed.args.len(), MAX_ARGS - 3);
        assert_eq!(parsed.redirections.input, Some("in.txt"));
        assert_eq!(parsed.redirections.stdout.map(|t| t.file), Some("out.txt"));
    }

    #[test]
    fn test_excess_arguments_end_the_line() {
        let line = format!("echo {} > out.txt", vec!["a"; MAX_ARGS].join(" "));
        let parsed = parse(&line).unwrap();
        assert_eq!(parsed.args.len(), MAX_ARGS - 1);
        assert!(parsed.redirections.is_empty());
    }

    #[test]
    fn test_parse_every_operator() {
        let parsed = parse("sort < in.txt >> out.txt 2> err.txt -r").unwrap();
        assert_eq!(parsed.args, vec!["sort", "-r"]);
        assert_eq!(
            parsed.redirections,
            Redirections {
                input: Some("in.txt"),
                stdout: Some(Redirection {
                    file: "out.txt",
                    append: true
                }),
                stderr: Some(Redirection {
                    file: "err.txt",
                    append: false
                }),
                merge_stderr: false,
                combined: None,
            }
        );

        let parsed = parse("ls 2>> err.txt").unwrap();
        assert_eq!(
            parsed.redirections.stderr,
            Some(Redirection {
                file: "err.txt",
                append: true
            })
        );
    }

    #[test]
    fn test_merge_takes_no_operand() {
        let parsed = parse("ls 2>&1 extra").unwrap();
        assert_eq!(parsed.args, vec!["ls", "extra"]);
        assert!(parsed.redirections.merge_stderr);
    }

    #[test]
    fn test_merge_and_stderr_file_exclude_each_other() {
        let parsed = parse("ls 2> err.txt 2>&1").unwrap();
        assert!(parsed.redirections.merge_stderr);
        assert_eq!(parsed.redirections.stderr, None);

        let parsed = parse("ls 2>&1 2> err.txt").unwrap();
        assert!(!parsed.redirections.merge_stderr);
        assert_eq!(parsed.redirections.stderr.map(|t| t.file), Some("err.txt"));
    }

    #[test]
    fn test_combined_clears_discrete_targets() {
        for op in ["&>", ">&"] {
            let line = format!("ls > out.txt 2> err.txt {op} all.txt");
            let parsed = parse(&line).unwrap();
            let r = parsed.redirections;
            assert_eq!(r.combined, Some("all.txt"));
            assert_eq!(r.stdout, None);
            assert_eq!(r.stderr, None);
        }

        // a later discrete target is stored but has no effect
        let parsed = parse("ls &> all.txt > out.txt").unwrap();
        let r = parsed.redirections;
        assert_eq!(r.stdout.map(|t| t.file), Some("out.txt"));
        assert_eq!(r.output_target(), None);
        assert_eq!(r.error_target(), None);
    }

    #[test]
    fn test_dangling_operator_is_a_syntax_error() {
        for op in ["<", ">", ">>", "2>", "2>>", "&>", ">&"] {
            let line = format!("ls {op}");
            match parse(&line) {
                Err(ShellError::Syntax { operator }) => assert_eq!(operator, op),
                other => panic!("{line}: expected syntax error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_redirections_only_is_an_empty_command() {
        assert!(matches!(parse("> out.txt"), Err(ShellError::EmptyCommand)));
        assert!(matches!(parse("2>&1"), Err(ShellError::EmptyCommand)));
    }

    #[test]
    fn test_is_empty() {
        assert!(parse("ls -l").unwrap().redirections.is_empty());
        assert!(!parse("ls 2>&1").unwrap().redirections.is_empty());
    }

    #[test]
    fn test_validate_rejects_directory_targets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();

        for line in [
            format!("ls > {path}"),
            format!("ls 2>> {path}"),
            format!("ls &> {path}"),
            format!("cat < {path}"),
        ] {
            let parsed = parse(&line).unwrap();
            match parsed.redirections.validate() {
                Err(ShellError::TargetIsDirectory { path: p }) => assert_eq!(p, path),
                other => panic!("{line}: expected directory error, got {other:?}"),
            }
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_validate_missing_input() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.txt");
        let line = format!("cat < {}", missing.display());
        let parsed = parse(&line).unwrap();
        assert!(matches!(
            parsed.redirections.validate(),
            Err(ShellError::InputNotFound { .. })
        ));

        // a missing output target is fine, it gets created
        let line = format!("ls > {}", missing.display());
        assert!(parse(&line).unwrap().redirections.validate().is_ok());
    }

    #[test]
    fn test_open_truncates_and_appends() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(&out, "old\n").unwrap();

        let append_line = format!("ls >> {}", out.display());
        let parsed = parse(&append_line).unwrap();
        let mut streams = parsed.redirections.open_streams().unwrap();
        streams.stdout.as_mut().unwrap().write_all(b"new\n").unwrap();
        drop(streams);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "old\nnew\n");

        let truncate_line = format!("ls > {}", out.display());
        let parsed = parse(&truncate_line).unwrap();
        let streams = parsed.redirections.open_streams().unwrap();
        assert!(streams.stdin.is_none());
        assert!(streams.stderr.is_none());
        drop(streams);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn test_open_combined_shares_offset() {
        let dir = TempDir::new().unwrap();
        let all = dir.path().join("all.txt");
        std::fs::write(&all, "stale contents\n").unwrap();

        let line = format!("ls &> {}", all.display());
        let parsed = parse(&line).unwrap();
        let streams = parsed.redirections.open_streams().unwrap();
        let (mut out, mut err) = (streams.stdout.unwrap(), streams.stderr.unwrap());
        out.write_all(b"one\n").unwrap();
        err.write_all(b"two\n").unwrap();
        out.write_all(b"three\n").unwrap();
        drop((out, err));

        assert_eq!(std::fs::read_to_string(&all).unwrap(), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_open_input_reads() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "data").unwrap();

        let line = format!("cat < {}", input.display());
        let parsed = parse(&line).unwrap();
        let mut buf = String::new();
        parsed
            .redirections
            .open_streams()
            .unwrap()
            .stdin
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "data");
    }

    #[test]
    fn test_open_failure_names_the_path() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("no-such-dir").join("out.txt");
        let line = format!("ls > {}", bad.display());
        let parsed = parse(&line).unwrap();
        match parsed.redirections.open_streams() {
            Err(ShellError::Open { path, source }) => {
                assert_eq!(path, bad.to_str().unwrap());
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }
}
