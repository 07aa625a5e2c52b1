use std::path::{Path, PathBuf};

use git2::{build::CheckoutBuilder, BranchType, Repository};

use crate::error::{ReleaseError, Result};

/// Wrapper around a git2 Repository for the release flow.
///
/// Covers what a release run needs on an existing checkout: switching to the
/// release branch, fast-forward pulling, committing the version file,
/// annotated tagging and pushing. Source provisioning (clone, patches,
/// submodules) lives in the build wrapper and drives the git CLI instead.
pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| ReleaseError::config(format!("not a git repository: {}: {}", path.display(), e)))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| ReleaseError::config(format!("bare repository: {}", path.display())))?
            .to_path_buf();
        Ok(GitRepo { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Check out a local branch and sync the working tree to it.
    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        let (object, reference) = self.repo.revparse_ext(branch)?;
        self.repo.checkout_tree(&object, None)?;
        match reference {
            Some(reference) => {
                let name = reference
                    .name()
                    .ok_or_else(|| ReleaseError::config(format!("invalid reference for '{}'", branch)))?;
                self.repo.set_head(name)?;
            }
            None => self.repo.set_head_detached(object.id())?,
        }
        Ok(())
    }

    /// Fetch from the remote and fast-forward the local branch, then sync the
    /// working tree. Diverged branches are left alone; the release flow
    /// assumes nobody rewrites the release branch underneath it.
    pub fn pull(&self, remote_name: &str, branch: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|_| ReleaseError::config(format!("remote '{}' not found", remote_name)))?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(credential_callbacks());

        // Fetch all branches into remote-tracking refs plus all tags.
        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", remote_name);
        let refspecs = &[refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"];
        remote.fetch(refspecs, Some(&mut fetch_options), None)?;

        self.fast_forward(branch, remote_name)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }

    fn fast_forward(&self, branch: &str, remote_name: &str) -> Result<()> {
        let tracking = format!("refs/remotes/{}/{}", remote_name, branch);
        let remote_ref = match self.repo.find_reference(&tracking) {
            Ok(r) => r,
            // No remote branch, nothing to update.
            Err(_) => return Ok(()),
        };
        let remote_oid = remote_ref
            .target()
            .ok_or_else(|| ReleaseError::config(format!("invalid reference {}", tracking)))?;

        let local_branch = match self.repo.find_branch(branch, BranchType::Local) {
            Ok(b) => b,
            Err(_) => {
                let remote_commit = self.repo.find_commit(remote_oid)?;
                self.repo.branch(branch, &remote_commit, false)?;
                return Ok(());
            }
        };

        let local_ref = local_branch.into_reference();
        let local_oid = match local_ref.target() {
            Some(oid) => oid,
            None => return Ok(()),
        };
        if local_oid == remote_oid {
            return Ok(());
        }
        if !self.repo.graph_descendant_of(remote_oid, local_oid)? {
            // Local is ahead or diverged; leave it.
            return Ok(());
        }

        let mut reference = self.repo.find_reference(&format!("refs/heads/{}", branch))?;
        reference.set_target(remote_oid, &format!("fast-forward from {}", tracking))?;
        Ok(())
    }

    /// Stage the given workdir-relative paths and commit them on HEAD.
    pub fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let signature = self.repo.signature()?;
        let parent = self.repo.head()?.peel_to_commit()?;
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
        Ok(())
    }

    /// Create an annotated tag on HEAD.
    pub fn tag_annotated(&self, name: &str, message: &str) -> Result<()> {
        let head = self.repo.head()?.peel(git2::ObjectType::Commit)?;
        let signature = self.repo.signature()?;
        self.repo.tag(name, &head, &signature, message, false)?;
        Ok(())
    }

    /// Push the given refspecs to a remote.
    pub fn push(&self, remote_name: &str, refspecs: &[&str]) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|_| ReleaseError::config(format!("remote '{}' not found", remote_name)))?;

        let mut callbacks = credential_callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                Err(git2::Error::from_str(&format!(
                    "push failed for {}: {}",
                    refname, status
                )))
            } else {
                Ok(())
            }
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);
        remote.push(refspecs, Some(&mut push_options))?;
        Ok(())
    }
}

/// SSH credential resolution for fetch and push: keys from `~/.ssh`, then the
/// agent, then whatever default helper applies. Local path remotes never hit
/// this callback.
fn credential_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let key_path = std::path::PathBuf::from(&home).join(".ssh").join(key);
                if key_path.exists() {
                    if let Ok(cred) = git2::Cred::ssh_key(username, None, &key_path, None) {
                        return Ok(cred);
                    }
                }
            }
            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }
        git2::Cred::default()
    });
    callbacks
}
