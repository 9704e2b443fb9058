use crate::command::{CommandFactory, ExecutableCommand, StageIo, Started};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Command that is not a builtin: a program found on disk.
pub struct ExternalCommand {
    name: OsString,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let program = find_command_path(&env.search_path(), &env.current_dir, Path::new(name))?;
        Some(Box::new(ExternalCommand::new(
            name.into(),
            program,
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn start(self: Box<Self>, io: StageIo, env: &mut Environment) -> Result<Started> {
        // The Command holds the parent's copies of the stage's streams; it is
        // dropped at the end of this call, right after the spawn.
        let mut cmd = std::process::Command::new(&self.program);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(&self.name);
        }
        let child = cmd
            .args(&self.args)
            .stdin(io.stdin.stdio())
            .stdout(io.stdout.stdio())
            .stderr(io.stderr.stdio())
            .env_clear()
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()
            .with_context(|| format!("{}", self.name.to_string_lossy()))?;
        log::debug!("spawned {} as pid {}", self.program.display(), child.id());
        Ok(Started::Running(child))
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is a file.
/// - Relative with multiple components (e.g., `bin/sh` or `./foo`): returns it,
///   joined to `cwd`, if it is a file.
/// - Single path component (no separators): search each directory in
///   `search_paths` (PATH) in order and return the first file found.
/// - Empty path: returns `None`.
pub fn find_command_path(search_paths: &[PathBuf], cwd: &Path, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return find_by_path(path.to_path_buf());
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, None) => None,
        // A bare name like `ls` -> search in PATH; `./foo` has two components
        (Some(x), None) if !path.as_os_str().to_string_lossy().contains('/') => {
            find_in_path(search_paths, x.as_os_str())
        }
        // Anything with a separator -> relative to the current directory
        _ => find_by_path(cwd.join(path)),
    }
}

fn find_in_path(search_paths: &[PathBuf], cmd: &std::ffi::OsStr) -> Option<PathBuf> {
    search_paths
        .iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| find_by_path(dir.join(cmd)))
}

/// Only regular files (or links to them) count; directories such as `.` never do.
fn find_by_path(path: PathBuf) -> Option<PathBuf> {
    if path.is_file() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::fs::File;

    fn bin() -> Vec<PathBuf> {
        vec![PathBuf::from("/bin")]
    }

    fn cwd() -> PathBuf {
        std::env::current_dir().expect("cwd")
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let res = find_command_path(&bin(), &cwd(), path);
        assert_eq!(res.as_deref(), Some(path), "Expected to find /bin/sh via absolute path");
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        let res = find_command_path(&bin(), &cwd(), path);
        assert!(
            res.is_none(),
            "Expected not to find /bin/nonexisting via absolute path"
        );
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let res = find_command_path(&bin(), &cwd(), Path::new("sh"));
        let found = res.expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(found, PathBuf::from("/bin/sh"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(&bin(), &cwd(), Path::new("nonexisting"));
        assert!(res.is_none(), "Expected not to find 'nonexisting' in PATH");
    }

    #[test]
    fn bare_name_is_not_looked_up_in_cwd() {
        let tmp_base =
            std::env::temp_dir().join(format!("external_tests_{}_bare", std::process::id()));
        let _ = fs::remove_dir_all(&tmp_base);
        fs::create_dir_all(&tmp_base).expect("create temp dir");
        File::create(tmp_base.join("tool")).expect("touch tool");

        let res = find_command_path(&[], &tmp_base, Path::new("tool"));
        assert!(res.is_none());

        let _ = fs::remove_dir_all(tmp_base);
    }

    #[test]
    fn multiple_components_relative_existing() {
        // A nested file bin/sh inside a scratch directory used as the cwd
        let tmp_base =
            std::env::temp_dir().join(format!("external_tests_{}_mc", std::process::id()));
        let _ = fs::remove_dir_all(&tmp_base);
        fs::create_dir_all(tmp_base.join("bin")).expect("create temp bin dir");
        File::create(tmp_base.join("bin").join("sh")).expect("touch bin/sh");

        let res = find_command_path(&[PathBuf::from("/does/not/matter")], &tmp_base, Path::new("bin/sh"));
        let found = res.expect("Expected to find relative 'bin/sh' in current dir");
        assert_eq!(found, tmp_base.join("bin/sh"));

        let res = find_command_path(&[], &tmp_base, Path::new("./bin/sh"));
        assert!(res.is_some(), "Expected to find './bin/sh' in current dir");

        let _ = fs::remove_dir_all(tmp_base);
    }

    #[test]
    fn directories_are_not_commands() {
        let tmp_base =
            std::env::temp_dir().join(format!("external_tests_{}_dirs", std::process::id()));
        let _ = fs::remove_dir_all(&tmp_base);
        fs::create_dir_all(tmp_base.join("tool")).expect("create directory named tool");
        let search = vec![tmp_base.clone()];

        assert!(find_command_path(&search, &tmp_base, Path::new(".")).is_none());
        assert!(find_command_path(&search, &tmp_base, Path::new("..")).is_none());
        assert!(find_command_path(&search, &tmp_base, Path::new("tool")).is_none());
        assert!(find_command_path(&search, &tmp_base, Path::new("./tool")).is_none());
        assert!(find_command_path(&search, &tmp_base, &tmp_base).is_none());

        let _ = fs::remove_dir_all(tmp_base);
    }

    #[test]
    fn empty_path_is_none() {
        let res = find_command_path(&bin(), &cwd(), Path::new(""));
        assert!(res.is_none(), "Empty path should not resolve to anything");
    }
}
