use std::io;
use std::process::{Command, Stdio};

use serverkeep_core::{Report, Reporter, TerminalKind};

use crate::error::SupervisorError;
use crate::launch::exit_code;

/// Starts processes from an argv list.
pub trait ProcessSpawner {
    /// Starts `argv` without waiting for it.
    fn spawn_detached(&self, argv: &[String]) -> io::Result<()>;

    /// Runs `argv` on this console and returns its exit code.
    fn run_attached(&self, argv: &[String]) -> io::Result<i32>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

fn command_for(argv: &[String]) -> io::Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    let mut command = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;

        if is_cmd(program) {
            command.raw_arg(cmd_arguments(args));
            return Ok(command);
        }
    }
    command.args(args);
    Ok(command)
}

/// Whether `program` is the Windows command interpreter.
pub fn is_cmd(program: &str) -> bool {
    let name = program.rsplit(['\\', '/']).next().unwrap_or(program);
    name.eq_ignore_ascii_case("cmd") || name.eq_ignore_ascii_case("cmd.exe")
}

/// Argument string for `cmd.exe`, which does not understand backslash
/// escaped quotes.
///
/// The last argument is the command line `cmd` runs and is wrapped in one
/// extra pair of quotes that `cmd` strips, so quoted paths inside it survive.
/// Earlier arguments are quoted only when they contain whitespace.
pub fn cmd_arguments(args: &[String]) -> String {
    let Some((command_line, leading)) = args.split_last() else {
        return String::new();
    };
    let mut parts = leading
        .iter()
        .map(|arg| {
            if arg.is_empty() || (arg.contains(char::is_whitespace) && !arg.contains('"')) {
                format!("\"{arg}\"")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>();
    parts.push(format!("\"{command_line}\""));
    parts.join(" ")
}

impl ProcessSpawner for SystemSpawner {
    fn spawn_detached(&self, argv: &[String]) -> io::Result<()> {
        command_for(argv)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }

    fn run_attached(&self, argv: &[String]) -> io::Result<i32> {
        let status = command_for(argv)?.status()?;
        Ok(exit_code(status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalLaunch {
    LaunchedIn(TerminalKind),
    FellBack,
}

/// Opens `command_line` in the first terminal emulator that starts.
///
/// Candidates are tried in order and failures are only reported. When none
/// starts, `fallback` runs attached to this console and its exit code is
/// ignored.
pub fn launch_in_terminal(
    kinds: &[TerminalKind],
    command_line: &str,
    fallback: &[String],
    spawner: &dyn ProcessSpawner,
    reporter: &dyn Reporter,
) -> Result<TerminalLaunch, SupervisorError> {
    for kind in kinds {
        let argv = kind.expand(command_line);
        match spawner.spawn_detached(&argv) {
            Ok(()) => {
                reporter.report(Report::TerminalLaunched {
                    terminal: kind.name().to_string(),
                });
                return Ok(TerminalLaunch::LaunchedIn(kind.clone()));
            }
            Err(err) => reporter.report(Report::TerminalLaunchFailed {
                terminal: kind.name().to_string(),
                reason: err.to_string(),
            }),
        }
    }

    reporter.report(Report::TerminalFallback);
    spawner
        .run_attached(fallback)
        .map_err(|source| SupervisorError::Spawn {
            program: fallback.first().cloned().unwrap_or_default(),
            source,
        })?;
    Ok(TerminalLaunch::FellBack)
}
