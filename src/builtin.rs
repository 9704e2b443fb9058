use crate::command::{CommandFactory, ExecutableCommand, ExitCode, StageIo, Started};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::resolver::{Resolution, resolve};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by builtins. The shell prints them prefixed with the
/// builtin's name and keeps running.
#[derive(Debug, Error)]
pub enum BuiltinError {
    /// An argument that must be an integer is not one.
    #[error("{0}: numeric argument required")]
    InvalidArgument(String),
    /// `cd` target does not exist or is not a directory.
    #[error("{0}: No such file or directory")]
    DirectoryNotFound(String),
    /// A required argument was not given.
    #[error("missing argument")]
    MissingArgument,
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;

    /// Builds the command from the words that follow its name.
    ///
    /// The words are operands only: a `--` is put in front of them, so `-1` or
    /// `help` reach the positional fields unchanged.
    fn parse(name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push("--");
        words.extend_from_slice(args);
        Self::from_args(&[name], &words)
    }
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn start(self: Box<Self>, io: StageIo, env: &mut Environment) -> Result<Started> {
        let StageIo {
            mut stdin,
            mut stdout,
            mut stderr,
        } = io;
        let result = T::execute(*self, &mut stdin, &mut stdout, &mut stderr, env).and_then(|code| {
            stdout.flush()?;
            Ok(code)
        });
        let code = match result {
            Ok(x) => x,
            Err(e) => {
                writeln!(stderr, "{}: {}", T::name(), e)?;
                1
            }
        };
        stderr.flush()?;
        Ok(Started::Finished(code))
    }
}

/// Outcome of an argument list `argh` refused: usage errors or `--help` output.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn start(self: Box<Self>, io: StageIo, _env: &mut Environment) -> Result<Started> {
        let (mut out, code) = if self.is_error {
            (io.stderr, 2)
        } else {
            (io.stdout, 0)
        };
        writeln!(out, "{}", self.output.trim_end())?;
        out.flush()?;
        Ok(Started::Finished(code))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::parse(name, args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Factories of all builtins, one per name of [`crate::resolver::BUILTIN_NAMES`].
pub(crate) fn factories() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Type>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<History>::default()),
    ]
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target, or with `~`, changes to the home directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let target = match self.target.as_deref() {
            None | Some("") | Some("~") => env.home_dir(),
            Some(t) => PathBuf::from(t),
        };

        let new_dir = if target.is_absolute() {
            target.clone()
        } else {
            env.current_dir.join(&target)
        };

        let not_found = || BuiltinError::DirectoryNotFound(target.display().to_string());
        let canonical = fs::canonicalize(&new_dir).map_err(|_| not_found())?;
        if !canonical.is_dir() {
            return Err(not_found().into());
        }

        env::set_current_dir(&canonical).map_err(|_| not_found())?;
        log::debug!("cd: now in {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell with the given status, or 0.
pub struct Exit {
    #[argh(positional)]
    /// exit status; must be an integer.
    pub code: Option<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let code = match self.code {
            None => 0,
            Some(arg) => arg
                .parse::<ExitCode>()
                .map_err(|_| BuiltinError::InvalidArgument(arg))?,
        };
        env.request_exit(code);
        Ok(code)
    }
}

/// Write the arguments to standard output, followed by a newline.
///
/// Arguments are written back to back: the parser already keeps the single `" "`
/// separators between words, so no flags are interpreted and no spaces are added.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn parse(name: &str, args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[name], args)
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.concat())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Tell whether a name is a shell builtin or which file it runs.
pub struct Type {
    #[argh(positional)]
    /// the command name to look up.
    pub name: Option<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let name = self.name.ok_or(BuiltinError::MissingArgument)?;
        match resolve(env, &name) {
            Resolution::Builtin(_) => writeln!(stdout, "{name} is a shell builtin")?,
            Resolution::External(path) => writeln!(stdout, "{name} is {}", path.display())?,
            Resolution::Unresolved => {
                writeln!(stderr, "{name}: not found")?;
                return Ok(1);
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List previously entered commands with their sequence numbers.
pub struct History {
    #[argh(positional)]
    /// show only this many of the most recent entries.
    pub limit: Option<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let limit = match self.limit {
            None => None,
            Some(arg) => Some(
                arg.parse::<usize>()
                    .map_err(|_| BuiltinError::InvalidArgument(arg))?,
            ),
        };
        for (n, line) in env.history.tail(limit) {
            writeln!(stdout, "{n} {line}")?;
        }
        Ok(0)
    }
}
