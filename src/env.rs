use crate::command::ExitCode;
use crate::history::History;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: variables captured at startup, visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `history`: the lines entered so far.
/// - `exit_code`: set by the `exit` builtin; the shell loop stops once it is present.
///
/// It is created once at startup and handed by reference to the executor and the
/// builtins, so no state lives in process-wide globals.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Commands entered during the session, oldest first.
    pub history: History,
    exit_code: Option<ExitCode>,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`. History starts empty.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(vars, current_dir)
    }

    /// Build an environment from explicit variables, ignoring the process state.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            history: History::new(),
            exit_code: None,
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Directories of the `PATH` variable, in search order.
    pub fn search_path(&self) -> Vec<PathBuf> {
        match self.vars.get("PATH") {
            Some(path) => stdenv::split_paths(path).collect(),
            None => Vec::new(),
        }
    }

    /// The user's home directory: `HOME`, or `/home/<USER>` when `HOME` is unset.
    pub fn home_dir(&self) -> PathBuf {
        match self.get_var("HOME") {
            Some(home) => PathBuf::from(home),
            None => PathBuf::from("/home").join(self.get_var("USER").unwrap_or_default()),
        }
    }

    /// Ask the shell to terminate with `code`.
    pub fn request_exit(&mut self, code: ExitCode) {
        self.exit_code = Some(code);
    }

    /// The code passed to `exit`, once it has been called.
    pub fn exit_code(&self) -> Option<ExitCode> {
        self.exit_code
    }

    pub fn should_exit(&self) -> bool {
        self.exit_code.is_some()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
