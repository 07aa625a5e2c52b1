use thiserror::Error;

/// Unified error type for cx-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version file error: {0}")]
    VersionFile(String),

    #[error("Unknown release kind '{0}' (expected release, beta or alpha)")]
    UnknownReleaseKind(String),

    #[error("Command `{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("Jenkins error: {0}")]
    Jenkins(String),

    #[error("Volume error: {0}")]
    Volume(String),
}

/// Convenience type alias for Results in cx-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version file error with context
    pub fn version_file(msg: impl Into<String>) -> Self {
        ReleaseError::VersionFile(msg.into())
    }

    /// Create an error for a failed external command
    pub fn command(command: impl Into<String>, detail: impl Into<String>) -> Self {
        ReleaseError::Command {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Create a Jenkins error with context
    pub fn jenkins(msg: impl Into<String>) -> Self {
        ReleaseError::Jenkins(msg.into())
    }

    /// Create a volume error with context
    pub fn volume(msg: impl Into<String>) -> Self {
        ReleaseError::Volume(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("missing jenkins host");
        assert_eq!(err.to_string(), "Configuration error: missing jenkins host");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_unknown_release_kind_names_input() {
        let err = ReleaseError::UnknownReleaseKind("FOO".to_string());
        let msg = err.to_string();
        assert!(msg.contains("FOO"));
        assert!(msg.contains("release, beta or alpha"));
    }

    #[test]
    fn test_command_error_includes_command_line() {
        let err = ReleaseError::command("git fetch", "exit status 128");
        let msg = err.to_string();
        assert!(msg.contains("git fetch"));
        assert!(msg.contains("128"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(ReleaseError::version_file("x")
            .to_string()
            .starts_with("Version file error"));
        assert!(ReleaseError::jenkins("x").to_string().starts_with("Jenkins"));
        assert!(ReleaseError::volume("x").to_string().starts_with("Volume"));
    }
}
