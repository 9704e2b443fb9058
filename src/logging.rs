//! Diagnostic logging of the shell itself.
//!
//! Messages go through the `log` facade; this module only installs the
//! `simplelog` backend once at startup.

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::path::Path;

/// Install the global logger.
///
/// Records at or above `level` go to standard error, or to `log_file` when one
/// is given so that they do not mix with the output of commands.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            WriteLogger::init(level, Config::default(), file)?;
        }
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }
    Ok(())
}
