use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

/// Complete configuration for cx-release.
///
/// Everything the release controller and build wrapper need that is not a
/// per-run CLI flag: tree locations, git naming, the Jenkins endpoint and the
/// CMake defaults.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub jenkins: JenkinsConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Locations of the working trees.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_base_path")]
    pub base: PathBuf,

    #[serde(default = "default_source_path")]
    pub source: PathBuf,

    #[serde(default = "default_build_path")]
    pub build: PathBuf,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_source_path() -> PathBuf {
    PathBuf::from("./source")
}

fn default_build_path() -> PathBuf {
    PathBuf::from("./build")
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            base: default_base_path(),
            source: default_source_path(),
            build: default_build_path(),
        }
    }
}

/// Git naming used by the release flow.
///
/// `data_dir` is the data tree checked out directly beneath the source tree;
/// releases tag and push both trees, so it must be a valid checkout with the
/// same remote name configured.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            remote: default_remote(),
            branch: default_branch(),
            data_dir: default_data_dir(),
        }
    }
}

/// Remote build server endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JenkinsConfig {
    #[serde(default = "default_jenkins_host")]
    pub host: String,

    #[serde(default = "default_jenkins_job")]
    pub job: String,
}

fn default_jenkins_host() -> String {
    "http://localhost:8080".to_string()
}

fn default_jenkins_job() -> String {
    "release-linux".to_string()
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        JenkinsConfig {
            host: default_jenkins_host(),
            job: default_jenkins_job(),
        }
    }
}

/// CMake and make defaults for the native build wrapper.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_generator")]
    pub generator: String,

    #[serde(default = "default_build_type")]
    pub build_type: String,

    #[serde(default = "default_threads")]
    pub threads: u32,

    #[serde(default = "default_shared_libs")]
    pub shared_libs: bool,

    #[serde(default = "default_cxx_flags")]
    pub cxx_flags: Option<String>,
}

fn default_generator() -> String {
    "Unix Makefiles".to_string()
}

fn default_build_type() -> String {
    "Release".to_string()
}

fn default_threads() -> u32 {
    4
}

fn default_shared_libs() -> bool {
    true
}

fn default_cxx_flags() -> Option<String> {
    Some("-Wno-deprecated".to_string())
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            generator: default_generator(),
            build_type: default_build_type(),
            threads: default_threads(),
            shared_libs: default_shared_libs(),
            cxx_flags: default_cxx_flags(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: PathsConfig::default(),
            git: GitConfig::default(),
            jenkins: JenkinsConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Lookup order:
/// 1. Custom path provided as parameter
/// 2. `cx-release.toml` in the current directory
/// 3. `cx-release.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| ReleaseError::config(format!("cannot read {}: {}", path, e)))?
    } else if Path::new("./cx-release.toml").exists() {
        fs::read_to_string("./cx-release.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("cx-release.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config =
        toml::from_str(&config_str).map_err(|e| ReleaseError::config(e.to_string()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.git.branch, "master");
        assert_eq!(config.git.data_dir, "data");
        assert_eq!(config.build.build_type, "Release");
        assert_eq!(config.jenkins.host, "http://localhost:8080");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [git]
            branch = "main"

            [jenkins]
            host = "https://ci.example.org"
            job = "imaging-release"
            "#,
        )
        .unwrap();
        assert_eq!(config.git.branch, "main");
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.jenkins.job, "imaging-release");
        assert_eq!(config.build.threads, 4);
    }

    #[test]
    fn test_load_config_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cx-release.toml");
        fs::write(&path, "[build]\nthreads = 16\n").unwrap();

        let config = load_config(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.build.threads, 16);
    }

    #[test]
    fn test_load_config_missing_custom_path() {
        let err = load_config(Some("/no/such/cx-release.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cx-release.toml");
        fs::write(&path, "[git\nbranch = ").unwrap();

        assert!(load_config(Some(path.to_str().unwrap())).is_err());
    }
}
