//! Mapping of command names to builtins or executables.

use crate::env::Environment;
use crate::external::find_command_path;
use std::path::{Path, PathBuf};

/// Names of the commands implemented inside the shell.
pub const BUILTIN_NAMES: [&str; 6] = ["exit", "echo", "type", "pwd", "cd", "history"];

/// What a command name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Builtin(&'static str),
    External(PathBuf),
    Unresolved,
}

pub fn builtin_name(name: &str) -> Option<&'static str> {
    BUILTIN_NAMES.iter().copied().find(|b| *b == name)
}

/// Classify `name`: builtins first, then the first `PATH` directory holding it.
pub fn resolve(env: &Environment, name: &str) -> Resolution {
    if let Some(builtin) = builtin_name(name) {
        return Resolution::Builtin(builtin);
    }
    match find_command_path(&env.search_path(), &env.current_dir, Path::new(name)) {
        Some(path) => Resolution::External(path),
        None => Resolution::Unresolved,
    }
}
