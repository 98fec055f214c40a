//! Blocking execution of shell commands.
//!
//! Every git and npm invocation goes through a [`CommandRunner`]. Calls block
//! until the child process exits and have no timeout: a hung command hangs
//! the run.
use log::*;
#[cfg(test)]
use mockall::automock;
use std::{path::Path, process::Command};

use crate::{error::ReleaseError, result::Result};

#[cfg_attr(test, automock)]
pub trait CommandRunner {
    /// Run `command` in `cwd` and return its trimmed stdout. A non-zero exit
    /// status is an error carrying stderr.
    fn run(&self, command: &str, cwd: &Path) -> Result<String>;

    /// Run `command` in `cwd` and report whether it exited with status 0.
    /// Only fails if the process could not be started.
    fn run_checked(&self, command: &str, cwd: &Path) -> Result<bool>;
}

/// Runs commands through the platform shell.
#[derive(Debug, Default, Clone)]
pub struct ShellRunner {}

impl ShellRunner {
    pub fn new() -> Self {
        Self {}
    }

    fn command(&self, command: &str, cwd: &Path) -> Command {
        debug!("executing `{command}` in {}", cwd.display());

        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C");
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c");
            cmd
        };

        cmd.arg(command).current_dir(cwd);
        cmd
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<String> {
        let output = self.command(command, cwd).output()?;

        if !output.status.success() {
            return Err(ReleaseError::CommandFailed {
                command: command.to_string(),
                cwd: cwd.display().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr)
                    .trim()
                    .to_string(),
            }
            .into());
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout.trim().to_string())
    }

    fn run_checked(&self, command: &str, cwd: &Path) -> Result<bool> {
        let output = self.command(command, cwd).output()?;

        if !output.status.success() {
            debug!(
                "`{command}` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output.status.success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_returns_trimmed_stdout() {
        let tmp = TempDir::new().unwrap();
        let runner = ShellRunner::new();
        let output = runner.run("echo '  hello  '", tmp.path()).unwrap();
        assert_eq!(output, "hello");
    }

    #[test]
    fn run_uses_working_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("marker.txt"), "found").unwrap();
        let runner = ShellRunner::new();
        let output = runner.run("cat marker.txt", tmp.path()).unwrap();
        assert_eq!(output, "found");
    }

    #[test]
    fn run_fails_on_non_zero_exit() {
        let tmp = TempDir::new().unwrap();
        let runner = ShellRunner::new();
        let err = runner
            .run("echo broken >&2; exit 3", tmp.path())
            .unwrap_err();

        match err.downcast_ref::<ReleaseError>() {
            Some(ReleaseError::CommandFailed { stderr, .. }) => {
                assert_eq!(stderr, "broken")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_checked_reports_exit_status() {
        let tmp = TempDir::new().unwrap();
        let runner = ShellRunner::new();
        assert!(runner.run_checked("true", tmp.path()).unwrap());
        assert!(!runner.run_checked("false", tmp.path()).unwrap());
    }
}
