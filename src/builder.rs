use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{BuildConfig, PathsConfig};
use crate::error::{ReleaseError, Result};
use crate::exec::CommandRunner;
use crate::ui;

/// The three working trees a native build operates on.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub base: PathBuf,
    pub build: PathBuf,
    pub source: PathBuf,
}

impl BuildPaths {
    pub fn from_config(paths: &PathsConfig) -> Self {
        BuildPaths {
            base: paths.base.clone(),
            build: paths.build.clone(),
            source: paths.source.clone(),
        }
    }
}

/// Typed CMake option set.
///
/// The recognized options are explicit fields; anything project-specific goes
/// through [BuildOptions::add_define] and keeps its insertion order, so the
/// assembled command line is deterministic.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub generator: String,
    pub build_type: String,
    pub shared_libs: bool,
    pub cxx_flags: Option<String>,
    extra_defines: Vec<(String, String)>,
}

impl BuildOptions {
    pub fn from_config(build: &BuildConfig) -> Self {
        BuildOptions {
            generator: build.generator.clone(),
            build_type: build.build_type.clone(),
            shared_libs: build.shared_libs,
            cxx_flags: build.cxx_flags.clone(),
            extra_defines: Vec::new(),
        }
    }

    /// Add a project-specific `-D<key>=<value>` define.
    pub fn add_define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_defines.push((key.into(), value.into()));
    }

    /// Assemble the `-D` arguments: the fixed defaults first, then the extra
    /// defines in insertion order.
    pub fn cmake_defines(&self) -> Vec<String> {
        let mut defines = vec![
            format!("-DCMAKE_BUILD_TYPE:STRING={}", self.build_type),
            format!(
                "-DBUILD_SHARED_LIBS:BOOL={}",
                if self.shared_libs { "ON" } else { "OFF" }
            ),
        ];
        if let Some(flags) = &self.cxx_flags {
            defines.push(format!("-DCMAKE_CXX_FLAGS:STRING={}", flags));
        }
        for (key, value) in &self.extra_defines {
            defines.push(format!("-D{}={}", key, value));
        }
        defines
    }
}

/// Thin wrapper for working on a C++ project checkout: configure and drive
/// the native build, and manage the source tree through the git CLI.
///
/// Everything runs synchronously through the supplied [CommandRunner]; any
/// failing command aborts the operation.
pub struct CppBuilder<'a, R: CommandRunner> {
    runner: &'a mut R,
    paths: BuildPaths,
    options: BuildOptions,
}

impl<'a, R: CommandRunner> CppBuilder<'a, R> {
    pub fn new(runner: &'a mut R, paths: BuildPaths, options: BuildOptions) -> Self {
        CppBuilder {
            runner,
            paths,
            options,
        }
    }

    /// Delete the build output tree.
    pub fn reset(&mut self) -> Result<()> {
        self.runner.remove_tree(&self.paths.build)
    }

    /// Run CMake in the build directory against the source tree.
    pub fn configure(&mut self) -> Result<()> {
        fs::create_dir_all(&self.paths.build)?;

        let source = path_arg(&self.paths.source)?;
        let defines = self.options.cmake_defines();
        ui::info("CMake options:");
        for define in &defines {
            ui::info(&format!("    {}", define));
        }

        let mut args: Vec<&str> = vec!["-G", self.options.generator.as_str()];
        args.extend(defines.iter().map(String::as_str));
        args.push(source);
        self.runner.run(&self.paths.build, "cmake", &args)
    }

    /// Invoke the native build with the given thread count.
    pub fn build(&mut self, threads: u32) -> Result<()> {
        let jobs = format!("-j{}", threads);
        self.runner.run(&self.paths.build, "make", &[&jobs])
    }

    pub fn make_clean(&mut self) -> Result<()> {
        self.runner.run(&self.paths.build, "make", &["clean"])
    }

    /// Clone a repository into a folder under the base path.
    pub fn git_clone(&mut self, repository: &str, folder: &str) -> Result<()> {
        self.runner
            .run(&self.paths.base, "git", &["clone", repository, folder])
    }

    /// Point origin at a new URL and re-attach the branch upstream.
    pub fn git_set_remote_url(&mut self, url: &str, branch: &str) -> Result<()> {
        let source = self.paths.source.clone();
        self.runner
            .run(&source, "git", &["remote", "set-url", "origin", url])?;
        self.runner.run(&source, "git", &["fetch"])?;
        let upstream = format!("--set-upstream-to=origin/{}", branch);
        self.runner
            .run(&source, "git", &["branch", &upstream, branch])
    }

    /// Pull the latest version of a branch, or check out an exact tag when
    /// one is given.
    pub fn git_update(&mut self, branch: &str, tag: Option<&str>, submodules: bool) -> Result<()> {
        if let Some(tag) = tag.filter(|t| !t.is_empty()) {
            return self.git_checkout(tag, None, submodules);
        }

        let source = self.paths.source.clone();
        self.runner.run(&source, "git", &["fetch"])?;
        self.runner.run(&source, "git", &["checkout", branch])?;
        self.runner
            .run(&source, "git", &["pull", "origin", branch])?;
        if submodules {
            self.git_submodule_update()?;
        }
        Ok(())
    }

    /// Update the source tree to the given tag, skipping entirely when the
    /// working tree already sits at it (or at the patch tag, when a patch is
    /// given). If a patch is given, apply it after the checkout.
    pub fn git_checkout(&mut self, tag: &str, patch: Option<&Path>, submodules: bool) -> Result<()> {
        let marker = match patch {
            Some(patch) => patch_tag_name(patch)?,
            None => tag.to_string(),
        };
        if self.is_at_tag(&marker)? {
            ui::info(&format!(
                "Skipping git update: tag {} already at HEAD in {}",
                marker,
                self.paths.source.display()
            ));
            return Ok(());
        }

        let source = self.paths.source.clone();
        self.runner.run(&source, "git", &["fetch"])?;
        self.runner.run(&source, "git", &["checkout", tag])?;
        if submodules {
            self.git_submodule_update()?;
        }
        if let Some(patch) = patch {
            self.apply_patch(patch)?;
        }
        Ok(())
    }

    fn is_at_tag(&mut self, tag: &str) -> Result<bool> {
        let output = self.runner.evaluate(
            &self.paths.source,
            "git",
            &["describe", "--tags", "--exact-match"],
        )?;
        Ok(output.as_deref() == Some(tag))
    }

    /// Apply a mailbox patch on a disposable branch, then force-tag the
    /// result so later runs can detect the patch is already in.
    fn apply_patch(&mut self, patch: &Path) -> Result<()> {
        let tag = patch_tag_name(patch)?;
        let branch = format!("{}_branch", tag);
        let patch_arg = path_arg(patch)?;
        let source = self.paths.source.clone();

        // The branch may not exist yet; that is fine.
        self.runner
            .run_unchecked(&source, "git", &["branch", "-D", &branch])?;
        self.runner
            .run(&source, "git", &["checkout", "-B", &branch])?;
        self.runner.run(
            &source,
            "git",
            &["am", "--whitespace=fix", "--signoff", patch_arg],
        )?;
        self.runner.run(&source, "git", &["tag", "-f", &tag])
    }

    fn git_submodule_update(&mut self) -> Result<()> {
        let source = self.paths.source.clone();
        self.runner.run(&source, "git", &["submodule", "sync"])?;
        self.runner.run(
            &source,
            "git",
            &["submodule", "update", "--init", "--recursive"],
        )
    }
}

/// Tag name for a patch file: its file name (e.g. `VTK-5-8-0.patch`).
fn patch_tag_name(patch: &Path) -> Result<String> {
    patch
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ReleaseError::config(format!("invalid patch path: {}", patch.display())))
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| ReleaseError::config(format!("non-unicode path: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::RecordingRunner;

    fn test_paths() -> BuildPaths {
        BuildPaths {
            base: PathBuf::from("/work"),
            build: PathBuf::from("/work/build"),
            source: PathBuf::from("/work/source"),
        }
    }

    fn test_options() -> BuildOptions {
        BuildOptions {
            generator: "Unix Makefiles".to_string(),
            build_type: "Release".to_string(),
            shared_libs: true,
            cxx_flags: Some("-Wno-deprecated".to_string()),
            extra_defines: Vec::new(),
        }
    }

    #[test]
    fn test_cmake_defines_defaults_then_extras() {
        let mut options = test_options();
        options.add_define("BUILD_TESTING:BOOL", "OFF");
        options.add_define("VTK_DIR:PATH", "/opt/vtk");
        assert_eq!(
            options.cmake_defines(),
            vec![
                "-DCMAKE_BUILD_TYPE:STRING=Release",
                "-DBUILD_SHARED_LIBS:BOOL=ON",
                "-DCMAKE_CXX_FLAGS:STRING=-Wno-deprecated",
                "-DBUILD_TESTING:BOOL=OFF",
                "-DVTK_DIR:PATH=/opt/vtk",
            ]
        );
    }

    #[test]
    fn test_build_runs_make_with_thread_count() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.build(8).unwrap();
        assert_eq!(runner.commands, vec!["make -j8"]);
        assert_eq!(runner.dirs[0], PathBuf::from("/work/build"));
    }

    #[test]
    fn test_make_clean() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.make_clean().unwrap();
        assert_eq!(runner.commands, vec!["make clean"]);
    }

    #[test]
    fn test_reset_removes_build_tree() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.reset().unwrap();
        assert_eq!(runner.removed, vec![PathBuf::from("/work/build")]);
    }

    #[test]
    fn test_configure_command_shape() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BuildPaths {
            base: dir.path().to_path_buf(),
            build: dir.path().join("build"),
            source: dir.path().join("source"),
        };
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, paths.clone(), test_options());
        builder.configure().unwrap();

        assert_eq!(runner.commands.len(), 1);
        let command = &runner.commands[0];
        assert!(command.starts_with("cmake -G Unix Makefiles"));
        assert!(command.contains("-DCMAKE_BUILD_TYPE:STRING=Release"));
        assert!(command.ends_with(paths.source.to_str().unwrap()));
        assert_eq!(runner.dirs[0], paths.build);
        assert!(paths.build.is_dir());
    }

    #[test]
    fn test_checkout_skips_when_already_at_tag() {
        let mut runner = RecordingRunner::new();
        runner.answer("git describe --tags --exact-match", "v5.8.0");
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.git_checkout("v5.8.0", None, true).unwrap();

        // Only the describe query; no fetch, no checkout.
        assert_eq!(runner.commands, vec!["git describe --tags --exact-match"]);
    }

    #[test]
    fn test_checkout_fetches_when_not_at_tag() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.git_checkout("v5.8.0", None, false).unwrap();
        assert_eq!(
            runner.commands,
            vec![
                "git describe --tags --exact-match",
                "git fetch",
                "git checkout v5.8.0",
            ]
        );
    }

    #[test]
    fn test_checkout_with_patch_checks_patch_tag() {
        let mut runner = RecordingRunner::new();
        runner.answer("git describe --tags --exact-match", "VTK-5-8-0.patch");
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder
            .git_checkout("v5.8.0", Some(Path::new("/patches/VTK-5-8-0.patch")), false)
            .unwrap();
        assert_eq!(runner.commands, vec!["git describe --tags --exact-match"]);
    }

    #[test]
    fn test_checkout_applies_patch() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder
            .git_checkout("v5.8.0", Some(Path::new("/patches/VTK-5-8-0.patch")), false)
            .unwrap();
        assert_eq!(
            runner.commands,
            vec![
                "git describe --tags --exact-match",
                "git fetch",
                "git checkout v5.8.0",
                "git branch -D VTK-5-8-0.patch_branch",
                "git checkout -B VTK-5-8-0.patch_branch",
                "git am --whitespace=fix --signoff /patches/VTK-5-8-0.patch",
                "git tag -f VTK-5-8-0.patch",
            ]
        );
    }

    #[test]
    fn test_update_branch_pulls() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.git_update("master", None, true).unwrap();
        assert_eq!(
            runner.commands,
            vec![
                "git fetch",
                "git checkout master",
                "git pull origin master",
                "git submodule sync",
                "git submodule update --init --recursive",
            ]
        );
    }

    #[test]
    fn test_update_with_tag_delegates_to_checkout() {
        let mut runner = RecordingRunner::new();
        runner.answer("git describe --tags --exact-match", "v5.8.0");
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.git_update("master", Some("v5.8.0"), false).unwrap();
        assert_eq!(runner.commands, vec!["git describe --tags --exact-match"]);
    }

    #[test]
    fn test_update_with_empty_tag_pulls_branch() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder.git_update("master", Some(""), false).unwrap();
        assert_eq!(
            runner.commands,
            vec!["git fetch", "git checkout master", "git pull origin master"]
        );
    }

    #[test]
    fn test_set_remote_url() {
        let mut runner = RecordingRunner::new();
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        builder
            .git_set_remote_url("git@example.org:imaging/platform.git", "master")
            .unwrap();
        assert_eq!(
            runner.commands,
            vec![
                "git remote set-url origin git@example.org:imaging/platform.git",
                "git fetch",
                "git branch --set-upstream-to=origin/master master",
            ]
        );
    }

    #[test]
    fn test_failing_command_aborts() {
        let mut runner = RecordingRunner::new();
        runner.fail_on("git checkout v5.8.0");
        let mut builder = CppBuilder::new(&mut runner, test_paths(), test_options());
        assert!(builder.git_checkout("v5.8.0", None, false).is_err());
    }
}
