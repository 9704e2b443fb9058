//! A small interactive shell.
//!
//! Input lines are split into tokens ([`lexer`]), grouped into a pipeline of
//! commands with their redirections ([`parser`]) and executed by the
//! [`Interpreter`]: builtins run in-process, other names are looked up on `PATH`
//! ([`resolver`]) and spawned as child processes connected by OS pipes.
//!
//! The public modules [`command`] and [`env`] expose the traits and types used to
//! implement commands and to inspect the shell's state.

mod builtin;
pub mod command;
pub mod completion;
pub mod env;
mod external;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod resolver;

pub use builtin::BuiltinError;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
