use crate::command::{Stdin, Stdout};
use crate::parser::{RedirectMode, Redirection};
use nix::fcntl::OFlag;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Result as IoResult, Write};
use std::path::Path;
use std::process::Stdio;

/// The shell's own standard input, handed to the first stage of a pipeline.
pub struct InheritedStdin(io::Stdin);

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.0.read(buf)
    }
}

impl Stdin for InheritedStdin {
    /// Children read the terminal directly.
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// The endpoints a pipeline talks to when no pipe or redirection applies.
///
/// By default these are the process's own standard streams. Each one can be
/// replaced by a file, which every stage then receives a duplicate of.
#[derive(Debug, Default)]
pub struct Terminal {
    stdin: Option<File>,
    stdout: Option<File>,
    stderr: Option<File>,
}

impl Terminal {
    /// Use the process's standard streams.
    pub fn inherit() -> Self {
        Self::default()
    }

    pub fn with_stdin(mut self, file: File) -> Self {
        self.stdin = Some(file);
        self
    }

    pub fn with_stdout(mut self, file: File) -> Self {
        self.stdout = Some(file);
        self
    }

    pub fn with_stderr(mut self, file: File) -> Self {
        self.stderr = Some(file);
        self
    }

    pub fn stdin(&self) -> IoResult<Box<dyn Stdin>> {
        let stdin: Box<dyn Stdin> = match &self.stdin {
            Some(file) => Box::new(file.try_clone()?),
            None => Box::new(InheritedStdin(io::stdin())),
        };
        Ok(stdin)
    }

    pub fn stdout(&self) -> IoResult<Box<dyn Stdout>> {
        let stdout: Box<dyn Stdout> = match &self.stdout {
            Some(file) => Box::new(file.try_clone()?),
            None => Box::new(io::stdout()),
        };
        Ok(stdout)
    }

    pub fn stderr(&self) -> IoResult<Box<dyn Stdout>> {
        let stderr: Box<dyn Stdout> = match &self.stderr {
            Some(file) => Box::new(file.try_clone()?),
            None => Box::new(io::stderr()),
        };
        Ok(stderr)
    }

    /// Print a diagnostic of the shell itself, as `minish: <message>`.
    pub fn report(&self, message: impl Display) {
        let written = self
            .stderr()
            .and_then(|mut err| writeln!(err, "minish: {message}"));
        if let Err(e) = written {
            log::warn!("cannot write diagnostic to stderr: {e}");
        }
    }
}

/// Create an OS pipe and return its `(read, write)` ends.
///
/// Both ends are close-on-exec, so a child only keeps the end it receives as one
/// of its standard streams.
pub fn pipe() -> nix::Result<(File, File)> {
    let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;
    Ok((File::from(read), File::from(write)))
}

/// Open the target file of a redirection, relative to `cwd`.
pub fn open_redirection(redirection: &Redirection, cwd: &Path) -> IoResult<File> {
    let mut options = OpenOptions::new();
    match redirection.mode {
        RedirectMode::Truncate => options.write(true).create(true).truncate(true),
        RedirectMode::Append => options.append(true).create(true),
    };
    options.open(cwd.join(&redirection.path))
}
