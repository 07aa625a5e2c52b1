use std::path::Path;
use std::process::Command;

use super::{command_line, CommandRunner};
use crate::error::{ReleaseError, Result};
use crate::ui;

/// Real command runner over `std::process::Command`.
///
/// The working directory is passed per call; nothing here mutates the
/// process-wide current directory. With `capture_output` set, child output is
/// collected and only surfaces in error messages; otherwise the child inherits
/// the parent's stdout/stderr.
pub struct Shell {
    pub echo: bool,
    pub capture_output: bool,
}

impl Shell {
    pub fn new() -> Self {
        Shell {
            echo: true,
            capture_output: false,
        }
    }

    fn command(&self, dir: &Path, program: &str, args: &[&str]) -> Command {
        if self.echo {
            ui::command(&command_line(program, args), dir);
        }
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        cmd
    }

    fn spawn_error(program: &str, args: &[&str], err: std::io::Error) -> ReleaseError {
        ReleaseError::command(
            command_line(program, args),
            format!("failed to start: {}", err),
        )
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for Shell {
    fn run(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<()> {
        let mut cmd = self.command(dir, program, args);

        if self.capture_output {
            let output = cmd
                .output()
                .map_err(|e| Self::spawn_error(program, args, e))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ReleaseError::command(
                    command_line(program, args),
                    format!("{}\n{}", output.status, stderr.trim_end()),
                ));
            }
        } else {
            let status = cmd
                .status()
                .map_err(|e| Self::spawn_error(program, args, e))?;
            if !status.success() {
                return Err(ReleaseError::command(
                    command_line(program, args),
                    status.to_string(),
                ));
            }
        }
        Ok(())
    }

    fn run_unchecked(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<bool> {
        let status = self
            .command(dir, program, args)
            .status()
            .map_err(|e| Self::spawn_error(program, args, e))?;
        Ok(status.success())
    }

    fn evaluate(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<Option<String>> {
        let output = self
            .command(dir, program, args)
            .output()
            .map_err(|e| Self::spawn_error(program, args, e))?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    fn remove_tree(&mut self, path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}
