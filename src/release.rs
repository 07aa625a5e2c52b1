use std::path::Path;

use crate::builder::{BuildOptions, BuildPaths, CppBuilder};
use crate::config::Config;
use crate::error::{ReleaseError, Result};
use crate::exec::Shell;
use crate::gitrepo::GitRepo;
use crate::jenkins::{JenkinsClient, RELEASE_TAG_PARAMETER};
use crate::ui;
use crate::version::{ReleaseKind, VersionFile, VERSION_FILE_NAME};

/// Stages of a release run, in order. Optional stages may be skipped but
/// progression is strictly forward; `Finished` is reached whether or not the
/// optional steps ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReleaseStage {
    Idle,
    Pulled,
    VersionBumped,
    Tagged,
    RemoteBuildTriggered,
    Finished,
}

/// Per-run options, from the CLI.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    pub kind: ReleaseKind,
    pub jenkins_release: bool,
    pub username: String,
    pub password: String,
    pub native_build: bool,
    pub threads: Option<u32>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Tag handed to the remote build trigger; empty for alpha runs.
    pub publish_tag: String,
}

/// Orchestrates one release: pull, bump/tag (twice for non-alpha kinds),
/// optional remote build trigger, optional native build, finish.
///
/// Preconditions: the source tree is a git checkout with the configured
/// remote, and the data tree is checked out at `<source>/<data_dir>` with the
/// same remote name. A missing data tree aborts the run; it is never skipped.
///
/// Fail-fast throughout: the first failing git operation, command or request
/// aborts the run, and already-created tags are not rolled back.
pub struct ReleaseRunner {
    config: Config,
    options: ReleaseOptions,
    stage: ReleaseStage,
}

impl ReleaseRunner {
    pub fn new(config: Config, options: ReleaseOptions) -> Self {
        ReleaseRunner {
            config,
            options,
            stage: ReleaseStage::Idle,
        }
    }

    pub fn stage(&self) -> ReleaseStage {
        self.stage
    }

    pub fn run(&mut self) -> Result<ReleaseSummary> {
        ui::header(1, &format!("Create release of type {}", self.options.kind));

        self.pull_latest()?;

        // Alpha runs publish nothing: no version mutation, no tag. Everything
        // else bumps for the requested kind, then immediately opens the next
        // alpha development window with a second bump.
        let publish_tag = if self.options.kind != ReleaseKind::Alpha {
            let mut version = VersionFile::load(&self.config.paths.source)?;
            ui::info(&format!(
                "Loaded previous version: {}",
                version.record.tag()
            ));
            self.bump(&mut version, self.options.kind)?;
            let publish_tag = version.record.tag();
            self.bump(&mut version, ReleaseKind::Alpha)?;
            publish_tag
        } else {
            String::new()
        };

        if self.options.jenkins_release && !publish_tag.is_empty() {
            self.trigger_remote_build(&publish_tag)?;
        }

        if self.options.native_build {
            self.native_build()?;
        }

        self.finish(&publish_tag);
        Ok(ReleaseSummary { publish_tag })
    }

    fn advance(&mut self, next: ReleaseStage) {
        debug_assert!(next >= self.stage, "release stages must move forward");
        if next > self.stage {
            self.stage = next;
        }
    }

    fn pull_latest(&mut self) -> Result<()> {
        let repo = GitRepo::open(&self.config.paths.source)?;
        repo.checkout_branch(&self.config.git.branch)?;
        repo.pull(&self.config.git.remote, &self.config.git.branch)?;
        self.advance(ReleaseStage::Pulled);
        Ok(())
    }

    /// Apply one increment: persist the record, commit it, tag both trees.
    fn bump(&mut self, version: &mut VersionFile, kind: ReleaseKind) -> Result<()> {
        version.record.increase(kind);
        let tag = version.record.tag();
        ui::header(3, &format!("Increasing version to {}", tag));
        validate_tag(&tag)?;

        version.save()?;
        self.advance(ReleaseStage::VersionBumped);

        self.commit_version(version)?;
        self.tag_trees(&tag)?;
        self.advance(ReleaseStage::Tagged);
        Ok(())
    }

    fn commit_version(&self, version: &VersionFile) -> Result<()> {
        let repo = GitRepo::open(version.source_path())?;
        let message = format!(
            "[script] Updating version file {} to {}",
            VERSION_FILE_NAME,
            version.record.tag()
        );
        repo.commit_paths(&[Path::new(VERSION_FILE_NAME)], &message)?;
        let branch = &self.config.git.branch;
        repo.push(
            &self.config.git.remote,
            &[&format!("refs/heads/{0}:refs/heads/{0}", branch)],
        )
    }

    /// Annotated tag + push in the source tree and the data tree beneath it.
    fn tag_trees(&self, tag: &str) -> Result<()> {
        let message = format!("Release {}. Generated by script", tag);
        let source = self.config.paths.source.clone();
        let data = source.join(&self.config.git.data_dir);
        // Without this check a missing data tree would resolve to the
        // enclosing source repository and tag it twice.
        if !data.join(".git").exists() {
            return Err(ReleaseError::config(format!(
                "data tree is not a git checkout: {}",
                data.display()
            )));
        }

        for tree in [source.as_path(), data.as_path()] {
            let repo = GitRepo::open(tree)?;
            repo.tag_annotated(tag, &message)?;
            repo.push(&self.config.git.remote, &[&format!("refs/tags/{}", tag)])?;
            ui::success(&format!("Tagged {} in {}", tag, tree.display()));
        }
        Ok(())
    }

    fn trigger_remote_build(&mut self, tag: &str) -> Result<()> {
        ui::header(3, &format!("Trigger jenkins build for tag {}", tag));
        let client = JenkinsClient::new(
            &self.config.jenkins.host,
            &self.options.username,
            &self.options.password,
        )?;
        client.trigger_build(&self.config.jenkins.job, &[(RELEASE_TAG_PARAMETER, tag)])?;
        ui::success(&format!(
            "Completed triggering the jenkins job {}",
            self.config.jenkins.job
        ));
        self.advance(ReleaseStage::RemoteBuildTriggered);
        Ok(())
    }

    fn native_build(&self) -> Result<()> {
        ui::header(3, "Native build");
        let mut shell = Shell::new();
        let paths = BuildPaths::from_config(&self.config.paths);
        let options = BuildOptions::from_config(&self.config.build);
        let threads = self.options.threads.unwrap_or(self.config.build.threads);
        let mut builder = CppBuilder::new(&mut shell, paths, options);
        builder.configure()?;
        builder.build(threads)
    }

    fn finish(&mut self, publish_tag: &str) {
        self.advance(ReleaseStage::Finished);
        if publish_tag.is_empty() {
            ui::success("Release run finished (nothing to publish)");
        } else {
            ui::success(&format!("Release run finished; publish tag {}", publish_tag));
        }
    }
}

/// Last line of defense before a tag string reaches git and the remote build
/// server: it must look like a tag this tool generates.
fn validate_tag(tag: &str) -> Result<()> {
    let pattern = regex::Regex::new(r"^v\d+\.\d+\.\d+(\.(alpha|beta))?$")
        .map_err(|e| ReleaseError::config(e.to_string()))?;
    if !pattern.is_match(tag) {
        return Err(ReleaseError::version_file(format!(
            "refusing to publish malformed tag '{}'",
            tag
        )));
    }
    Ok(())
}
