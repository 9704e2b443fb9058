use crate::command::{
    CANNOT_EXECUTE, COMMAND_NOT_FOUND, CommandFactory, ExecutableCommand, ExitCode, StageIo,
    Started, Stdin, Stdout,
};
use crate::env::Environment;
use crate::io_adapters::{Terminal, open_redirection, pipe};
use crate::lexer;
use crate::parser::{self, OutputStream, Pipeline};
use anyhow::{Context, Result};
use crate::completion::ShellHelper;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::fs::File;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Stage for a name that is neither a builtin nor found on `PATH`.
///
/// It runs nothing: its pipe ends are closed as soon as it is started, so the
/// neighbouring stages see a closed pipe and end of input.
struct UnresolvedCommand {
    name: String,
}

impl ExecutableCommand for UnresolvedCommand {
    fn start(self: Box<Self>, io: StageIo, _env: &mut Environment) -> Result<Started> {
        let StageIo {
            stdin,
            stdout,
            mut stderr,
        } = io;
        drop(stdin);
        drop(stdout);
        writeln!(stderr, "{}: command not found", self.name)?;
        stderr.flush()?;
        Ok(Started::Finished(COMMAND_NOT_FOUND))
    }
}

/// A small interactive shell: reads lines, splits them into pipelines and runs
/// builtins and external programs connected by OS pipes.
///
/// The interpreter owns the [`Environment`], the [`Terminal`] its pipelines talk
/// to, and a list of [`CommandFactory`] objects queried in order to create
/// commands by name. See [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.execute_line("type echo").unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    terminal: Terminal,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            terminal: Terminal::inherit(),
            commands,
        }
    }

    /// Replace the environment captured at construction.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Connect pipelines to `terminal` instead of the process's standard streams.
    pub fn with_terminal(mut self, terminal: Terminal) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Print a diagnostic of the shell on its standard error.
    pub fn report(&self, message: impl std::fmt::Display) {
        self.terminal.report(message);
    }

    /// Run one input line.
    ///
    /// Blank lines do nothing. Other lines are recorded in the history, then
    /// tokenized, parsed and executed. Lexing and parsing errors are returned;
    /// failures of individual stages are reported and folded into the exit code.
    pub fn execute_line(&mut self, line: &str) -> Result<ExitCode> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(0);
        }
        self.env.history.push(line);

        let tokens = lexer::split_into_tokens(line)?;
        log::debug!("tokens = {tokens:?}");
        let pipeline = parser::parse_pipeline(tokens)?;
        log::debug!("pipeline = {pipeline:?}");
        self.execute_pipeline(&pipeline)
    }

    /// Create the command for one stage, falling back to a stage that only
    /// reports `command not found`.
    fn create_command(&self, name: &str, args: &[&str]) -> Box<dyn ExecutableCommand> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd;
            }
        }
        log::debug!("{name}: unresolved");
        Box::new(UnresolvedCommand {
            name: name.to_string(),
        })
    }

    /// Run a parsed pipeline and return the exit code of its last stage.
    ///
    /// Stages are started left to right, each connected to the next by a pipe.
    /// Only the last stage's redirections apply. If a stage calls `exit`, no later
    /// stage is started, nothing is waited on and the requested code is returned.
    pub fn execute_pipeline(&mut self, pipeline: &Pipeline) -> Result<ExitCode> {
        let Some(last) = pipeline.last() else {
            return Ok(0);
        };

        let mut commands = Vec::with_capacity(pipeline.segments.len());
        for segment in &pipeline.segments {
            let args: Vec<&str> = segment.args.iter().map(|s| s.as_str()).collect();
            commands.push((segment.name.as_str(), self.create_command(&segment.name, &args)));
        }

        let mut stdout_file: Option<File> = None;
        let mut stderr_file: Option<File> = None;
        for redirection in &last.redirections {
            let file = match open_redirection(redirection, &self.env.current_dir) {
                Ok(file) => file,
                Err(e) => {
                    self.report(format_args!("{}: {e}", redirection.path.display()));
                    return Ok(1);
                }
            };
            match redirection.stream {
                OutputStream::Stdout => stdout_file = Some(file),
                OutputStream::Stderr => stderr_file = Some(file),
            }
        }

        let count = commands.len();
        let mut started = Vec::with_capacity(count);
        let mut stdin: Box<dyn Stdin> = self.terminal.stdin()?;
        for (i, (name, cmd)) in commands.into_iter().enumerate() {
            let is_last = i + 1 == count;
            let mut next_stdin: Option<Box<dyn Stdin>> = None;
            let stdout: Box<dyn Stdout> = if is_last {
                match stdout_file.take() {
                    Some(file) => Box::new(file),
                    None => self.terminal.stdout()?,
                }
            } else {
                let (read, write) = pipe().context("cannot create pipe")?;
                next_stdin = Some(Box::new(read));
                Box::new(write)
            };
            let stderr: Box<dyn Stdout> = match stderr_file.take_if(|_| is_last) {
                Some(file) => Box::new(file),
                None => self.terminal.stderr()?,
            };

            let io = StageIo {
                stdin,
                stdout,
                stderr,
            };
            match cmd.start(io, &mut self.env) {
                Ok(stage) => started.push((name, stage)),
                Err(e) => {
                    self.report(format_args!("{e:#}"));
                    started.push((name, Started::Finished(CANNOT_EXECUTE)));
                }
            }

            if let Some(code) = self.env.exit_code() {
                log::debug!("exit {code} requested by {name}");
                return Ok(code);
            }

            stdin = match next_stdin {
                Some(next) => next,
                None => break,
            };
        }

        let mut status = 0;
        for (name, stage) in started {
            status = match stage.wait() {
                Ok(code) => code,
                Err(e) => {
                    self.report(format_args!("{name}: {e:#}"));
                    CANNOT_EXECUTE
                }
            };
        }
        log::debug!("pipeline exited with {status}");
        Ok(status)
    }

    /// Read-Eval-Print Loop over the line editor.
    ///
    /// Returns the code passed to `exit`, or 0 at end of input. Lines that fail
    /// to lex or parse are reported and the loop goes on with the next one.
    /// Tab completes command names; a second tab lists ambiguous matches.
    pub fn repl(&mut self, prompt: &str) -> Result<ExitCode> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .build();
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::with_config(config)?;
        rl.set_helper(Some(ShellHelper::new(self.env.search_path())));
        for line in self.env.history.entries() {
            rl.add_history_entry(line.as_str())?;
        }

        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim())?;
                    }
                    if let Err(e) = self.execute_line(&line) {
                        self.report(format_args!("{e:#}"));
                    }
                    if let Some(code) = self.env.exit_code() {
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(0),
                Err(err) => return Err(err).context("cannot read input"),
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `echo`, `type`, `pwd`, `cd`, `history`
    /// - external command launcher
    fn default() -> Self {
        use crate::external::ExternalCommand;
        let mut commands = crate::builtin::factories();
        commands.push(Box::new(Factory::<ExternalCommand>::default()));
        Self::new(commands)
    }
}
