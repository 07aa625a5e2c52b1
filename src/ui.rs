//! Console output helpers for the release and build scripts.
//!
//! Non-interactive by design: this tool runs under CI, so everything is
//! plain line output with a little styling. Headers come in two levels,
//! matching the banners the build scripts have always printed.

use std::path::Path;

use console::style;

/// Print a banner header. Level 1 gets a full `=` banner, anything lower a
/// short `---` rule.
pub fn header(level: u8, text: &str) {
    if level <= 1 {
        println!("\n{}", "=".repeat(60));
        println!("{}", style(text).bold());
        println!("{}", "=".repeat(60));
    } else {
        println!("\n--- {} ---", style(text).bold());
    }
}

/// Print an informational line.
pub fn info(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Print a success line.
pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Echo an external command before it runs, with its working directory.
pub fn command(line: &str, dir: &Path) {
    println!("{} [{}] {}", style("$").dim(), dir.display(), style(line).cyan());
}
