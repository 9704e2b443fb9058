use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};
use std::process::{Child, ExitStatus, Stdio};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Exit code of a stage whose command could not be found.
pub const COMMAND_NOT_FOUND: ExitCode = 127;

/// Exit code of a stage whose program could not be started.
pub const CANNOT_EXECUTE: ExitCode = 126;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// Implementors typically wrap standard input or the read end of a pipe. A blanket
/// implementation exists for any type that implements `Read` and `Into<Stdio>`
/// (e.g. `File`).
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and `Into<Stdio>`
/// (`File`, `std::io::Stdout`, `std::io::Stderr`).
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// The three standard streams handed to one stage of a pipeline.
///
/// Ownership of every handle moves into the stage, so dropping the stage's copy
/// of a pipe end is what lets the other side observe end-of-stream.
pub struct StageIo {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
    pub stderr: Box<dyn Stdout>,
}

/// A stage after it has been started.
#[derive(Debug)]
pub enum Started {
    /// The stage ran in-process and is already done.
    Finished(ExitCode),
    /// An external program that is still running.
    Running(Child),
}

impl Started {
    /// Block until the stage terminates. A no-op for finished stages.
    pub fn wait(self) -> Result<ExitCode> {
        match self {
            Started::Finished(code) => Ok(code),
            Started::Running(mut child) => Ok(exit_code(child.wait()?)),
        }
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl, by external commands, and
/// by the placeholder used for names that resolve to nothing.
pub trait ExecutableCommand {
    /// Starts the command.
    ///
    /// Built-ins run to completion before returning; external commands are spawned
    /// and return immediately with [`Started::Running`].
    fn start(self: Box<Self>, io: StageIo, env: &mut Environment) -> Result<Started>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
/// Implementations can use the environment to resolve executables (e.g., using PATH).
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}

/// Translate a process exit status into a shell exit code.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}
