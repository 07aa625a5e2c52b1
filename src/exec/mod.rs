//! External command execution abstraction.
//!
//! Every operation that shells out (git CLI, cmake, make) goes through the
//! [CommandRunner] trait with an explicit working directory, instead of the
//! process-global current directory. Implementations:
//!
//! - [shell::Shell]: real implementation over `std::process::Command`
//! - [mock::RecordingRunner]: test implementation that records issued
//!   commands and answers queries from a script

pub mod mock;
pub mod shell;

pub use mock::RecordingRunner;
pub use shell::Shell;

use std::path::Path;

use crate::error::Result;

/// Synchronous external command execution with an explicit working directory.
///
/// All methods block until the command completes; there is no timeout or
/// cancellation. A non-zero exit status from [CommandRunner::run] is an error.
pub trait CommandRunner {
    /// Run a command in `dir`; non-zero exit is an error.
    fn run(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<()>;

    /// Run a command in `dir`, tolerating failure. Returns whether the
    /// command succeeded. Errors only when the command cannot be started.
    fn run_unchecked(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<bool>;

    /// Run a command in `dir` and capture its stdout. Returns `None` when the
    /// command exits non-zero, trimmed stdout otherwise.
    fn evaluate(&mut self, dir: &Path, program: &str, args: &[&str]) -> Result<Option<String>>;

    /// Delete a directory tree. Missing trees are not an error.
    fn remove_tree(&mut self, path: &Path) -> Result<()>;
}

/// Render a command for logs and error messages.
pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = String::from(program);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
