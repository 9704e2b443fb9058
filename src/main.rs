use anyhow::Result;
use argh::FromArgs;
use log::LevelFilter;
use minish::Interpreter;
use minish::command::ExitCode;
use minish::history::History;
use minish::logging;
use std::path::{Path, PathBuf};

#[derive(FromArgs)]
/// A small interactive shell with pipes and output redirection.
struct Args {
    /// run this command line, then exit with its status.
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// text shown before each input line.
    #[argh(option, default = "String::from(\"$ \")")]
    prompt: String,

    /// most verbose diagnostics to print: off, error, warn, info, debug or trace.
    #[argh(option, default = "LevelFilter::Warn")]
    log_level: LevelFilter,

    /// write diagnostics to this file instead of standard error.
    #[argh(option)]
    log_file: Option<PathBuf>,
}

fn main() {
    let args: Args = argh::from_env();
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("minish: {e:#}");
            2
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> Result<ExitCode> {
    logging::init(args.log_level, args.log_file.as_deref())?;

    let mut sh = Interpreter::default();
    load_history(&mut sh);

    match args.command {
        Some(line) => match sh.execute_line(&line) {
            Ok(code) => Ok(code),
            Err(e) => {
                sh.report(format_args!("{e:#}"));
                Ok(2)
            }
        },
        None => sh.repl(&args.prompt),
    }
}

/// Seed the history with the lines of `$HISTFILE`, if it is set and readable.
fn load_history(sh: &mut Interpreter) {
    let Some(path) = sh.env().get_var("HISTFILE") else {
        return;
    };
    match History::load(Path::new(&path)) {
        Ok(history) => {
            log::debug!("loaded {} history entries from {path}", history.len());
            sh.env_mut().history = history;
        }
        Err(e) => log::warn!("cannot read history file {path}: {e}"),
    }
}
