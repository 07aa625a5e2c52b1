use std::collections::HashMap;
use std::path::Path;

use super::{command_line, CommandRunner};
use crate::error::{ReleaseError, Result};

/// Mock command runner for testing without touching real tools.
///
/// Records every issued command line and answers [CommandRunner::evaluate]
/// from a scripted table. Commands listed in `failing` make `run` fail and
/// `run_unchecked` report failure.
pub struct RecordingRunner {
    /// Issued command lines, in order.
    pub commands: Vec<String>,
    /// Working directory of each issued command, parallel to `commands`.
    pub dirs: Vec<std::path::PathBuf>,
    /// Trees removed through the runner.
    pub removed: Vec<std::path::PathBuf>,
    evaluations: HashMap<String, String>,
    failing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner {
            commands: Vec::new(),
            dirs: Vec::new(),
            removed: Vec::new(),
            evaluations: HashMap::new(),
            failing: Vec::new(),
        }
    }

    /// Script the stdout answer for an evaluated command line.
    pub fn answer(&mut self, command: impl Into<String>, stdout: impl Into<String>) {
        self.evaluations.insert(command.into(), stdout.into());
    }

    /// Make a command line fail when run.
    pub fn fail_on(&mut self, command: impl Into<String>) {
        self.failing.push(command.into());
    }

    fn record(&mut self, dir: &Path, program: &str, args: &[&str]) -> String {
        let line = command_line(program, args);
        self.commands.push(line.clone());
        self.dirs.push(dir.to_path_buf());
        line
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<()> {
        let line = self.record(dir, program, args);
        if self.failing.contains(&line) {
            return Err(ReleaseError::command(line, "scripted failure"));
        }
        Ok(())
    }

    fn run_unchecked(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<bool> {
        let line = self.record(dir, program, args);
        Ok(!self.failing.contains(&line))
    }

    fn evaluate(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<Option<String>> {
        let line = self.record(dir, program, args);
        Ok(self.evaluations.get(&line).cloned())
    }

    fn remove_tree(&mut self, path: &Path) -> Result<()> {
        self.removed.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_commands_in_order() {
        let dir = Path::new("/work");
        let mut runner = RecordingRunner::new();
        runner.run(dir, "git", &["fetch"]).unwrap();
        runner.run(dir, "git", &["checkout", "v1.0.0"]).unwrap();
        assert_eq!(runner.commands, vec!["git fetch", "git checkout v1.0.0"]);
        assert_eq!(runner.dirs[0], dir);
    }

    #[test]
    fn test_scripted_evaluation() {
        let dir = Path::new("/work");
        let mut runner = RecordingRunner::new();
        runner.answer("git describe --tags --exact-match", "v1.0.0");
        let out = runner
            .evaluate(dir, "git", &["describe", "--tags", "--exact-match"])
            .unwrap();
        assert_eq!(out.as_deref(), Some("v1.0.0"));
        assert_eq!(runner.evaluate(dir, "git", &["status"]).unwrap(), None);
    }

    #[test]
    fn test_scripted_failure() {
        let dir = Path::new("/work");
        let mut runner = RecordingRunner::new();
        runner.fail_on("make -j8");
        assert!(runner.run(dir, "make", &["-j8"]).is_err());
        assert!(!runner.run_unchecked(dir, "make", &["-j8"]).unwrap());
        assert!(runner.run_unchecked(dir, "make", &["clean"]).unwrap());
    }
}
