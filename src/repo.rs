//! Local git repository operations used while staging a release.
//!
//! The repository being released is the one the command runs in. This
//! module wraps `git2` for everything that touches it: precondition checks
//! (clean work tree, branch checkout, fetch), release branch creation,
//! staging, committing and pushing.
//!
//! # Authentication
//!
//! Network operations (fetch, push) authenticate with a username/token pair
//! when a token is configured. The username comes from the local git
//! configuration.
//!
//! # Usage
//!
//! ```rust,ignore
//! let repo = Repository::open(Path::new("."), Some(token))?;
//! repo.fetch()?;
//! repo.create_branch("release/1.2.0")?;
//! repo.switch_branch("release/1.2.0")?;
//! repo.add_paths(&["package.json".into(), "CHANGELOG.md".into()])?;
//! repo.commit("Increment version to 1.2.0")?;
//! repo.push_branch("release/1.2.0")?;
//! ```
use color_eyre::eyre::eyre;
use git2::{BranchType, RemoteCallbacks, StatusOptions};
use git_url_parse::GitUrl;
use log::*;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

use crate::{error::ReleaseError, result::Result};

/// Name of the remote releases are fetched from and pushed to.
const DEFAULT_REMOTE: &str = "origin";

/// Username sent with the token when git has no `user.name`.
const FALLBACK_USER: &str = "x-access-token";

/// Create Git authentication callbacks for username/token authentication.
fn get_auth_callbacks<'r>(user: String, token: String) -> RemoteCallbacks<'r> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, _allowed| {
        git2::Cred::userpass_plaintext(&user, &token)
    });
    callbacks
}

/// Local repository operations a release is staged with.
#[cfg_attr(test, automock)]
pub trait LocalRepository {
    /// True when there are no staged, unstaged or conflicted changes to
    /// tracked files. Untracked and ignored files do not count.
    fn is_clean(&self) -> Result<bool>;

    /// Fetch all branches and tags from `origin`.
    fn fetch(&self) -> Result<()>;

    /// Check out `branch`, creating it from `origin/<branch>` if needed.
    fn switch_branch(&self, branch: &str) -> Result<()>;

    /// Create `branch` at HEAD, replacing an existing local branch.
    fn create_branch(&self, branch: &str) -> Result<()>;

    /// Stage `paths` relative to the working directory.
    fn add_paths(&self, paths: &[String]) -> Result<()>;

    /// Commit the staged changes on HEAD.
    fn commit(&self, msg: &str) -> Result<()>;

    /// Force push a local branch to `origin`.
    fn push_branch(&self, branch: &str) -> Result<()>;
}

/// The repository a release is staged from.
pub struct Repository {
    repo: git2::Repository,
    /// Token used for fetch and push. Anonymous when absent.
    token: Option<SecretString>,
}

impl Repository {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Precondition`] if `path` is not inside a git
    /// work tree.
    pub fn open(path: &Path, token: Option<SecretString>) -> Result<Self> {
        let repo = git2::Repository::discover(path).map_err(|e| {
            ReleaseError::precondition(format!(
                "{} is not a git repository: {}",
                path.display(),
                e.message()
            ))
        })?;

        if repo.is_bare() {
            return Err(ReleaseError::precondition(format!(
                "{} is a bare repository",
                path.display()
            ))
            .into());
        }

        Ok(Self { repo, token })
    }

    /// Get the repository's working directory path.
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| eyre!("Repository has no working directory"))
    }

    /// Basename of the working directory.
    pub fn name(&self) -> Result<String> {
        let workdir = self.workdir()?;
        let name = workdir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                eyre!("unable to determine repository name of {}", workdir.display())
            })?;
        Ok(name.to_string())
    }

    /// Owner and name of the repository on the forge.
    ///
    /// Read from the `origin` remote URL when it can be parsed. Otherwise
    /// the owner is `default_owner` and the name is the basename of the
    /// working directory.
    pub fn remote_slug(&self, default_owner: &str) -> Result<(String, String)> {
        if let Ok(remote) = self.repo.find_remote(DEFAULT_REMOTE)
            && let Some(url) = remote.url()
            && let Ok(parsed) = GitUrl::parse(url)
            && let Some(owner) = parsed.owner
        {
            debug!("using owner {owner} and repo {} from {url}", parsed.name);
            return Ok((owner, parsed.name));
        }

        if default_owner.is_empty() {
            return Err(ReleaseError::invalid_config(
                "no origin remote could be parsed and no org is configured",
            )
            .into());
        }

        Ok((default_owner.to_string(), self.name()?))
    }

    fn remote_callbacks(&self) -> Result<RemoteCallbacks<'static>> {
        let Some(token) = &self.token else {
            return Ok(RemoteCallbacks::new());
        };

        let config = self.repo.config()?.snapshot()?;
        let user = config
            .get_str("user.name")
            .map(|u| u.to_string())
            .unwrap_or_else(|_| FALLBACK_USER.to_string());

        Ok(get_auth_callbacks(user, token.expose_secret().to_string()))
    }
}

impl LocalRepository for Repository {
    /// True when there are no staged, unstaged or conflicted changes to
    /// tracked files. Untracked and ignored files do not count.
    fn is_clean(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;

        for entry in statuses.iter() {
            debug!(
                "uncommitted change: {} ({:?})",
                entry.path().unwrap_or("<non-utf8 path>"),
                entry.status()
            );
        }

        Ok(statuses.is_empty())
    }

    /// Fetch all branches and tags from `origin`.
    fn fetch(&self) -> Result<()> {
        info!("fetching from {DEFAULT_REMOTE}");
        let mut remote = self.repo.find_remote(DEFAULT_REMOTE).map_err(|e| {
            ReleaseError::precondition(format!(
                "remote {DEFAULT_REMOTE} not found: {}",
                e.message()
            ))
        })?;

        let mut fetch_opts = git2::FetchOptions::new();
        fetch_opts.remote_callbacks(self.remote_callbacks()?);
        fetch_opts.download_tags(git2::AutotagOption::All);

        let refspecs: [&str; 0] = [];
        remote
            .fetch(&refspecs, Some(&mut fetch_opts), None)
            .map_err(|e| {
                ReleaseError::precondition(format!(
                    "failed to fetch from {DEFAULT_REMOTE}: {}",
                    e.message()
                ))
            })?;

        Ok(())
    }

    /// Switch to the specified branch and update the working directory.
    ///
    /// A branch that only exists as `origin/<branch>` is created locally,
    /// tracking the remote one.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Precondition`] if the branch exists neither
    /// locally nor on `origin`.
    fn switch_branch(&self, branch: &str) -> Result<()> {
        info!("switching to branch: {branch}");

        if self.repo.find_branch(branch, BranchType::Local).is_err() {
            let remote_name = format!("{DEFAULT_REMOTE}/{branch}");
            let remote_branch = self
                .repo
                .find_branch(&remote_name, BranchType::Remote)
                .map_err(|_| {
                    ReleaseError::precondition(format!(
                        "branch {branch} does not exist"
                    ))
                })?;

            let commit = remote_branch.get().peel_to_commit()?;
            let mut local = self.repo.branch(branch, &commit, false)?;
            local.set_upstream(Some(remote_name.as_str()))?;
        }

        let ref_name = format!("refs/heads/{branch}");
        let target_obj = self.repo.revparse_single(&ref_name)?;
        self.repo.checkout_tree(&target_obj, None)?;
        self.repo.set_head(&ref_name)?;
        Ok(())
    }

    /// Create a new branch from the current HEAD, replacing any existing
    /// local branch with the same name.
    fn create_branch(&self, branch: &str) -> Result<()> {
        info!("creating branch: {branch}");
        let head = self.repo.head()?;
        let commit = head.peel_to_commit()?;
        self.repo.branch(branch, &commit, true)?;
        Ok(())
    }

    /// Stage `paths` (relative to the working directory). Paths that do not
    /// exist are skipped.
    fn add_paths(&self, paths: &[String]) -> Result<()> {
        let workdir = self.workdir()?;
        let mut index = self.repo.index()?;

        for path in paths {
            if !workdir.join(path).exists() {
                debug!("skipping missing file {path}");
                continue;
            }
            debug!("adding {path} to index");
            index.add_path(Path::new(path))?;
        }

        index.write()?;
        Ok(())
    }

    /// Create a new commit with the currently staged changes.
    ///
    /// Author and committer come from `user.name` and `user.email` in the
    /// git configuration. The commit is made on HEAD.
    fn commit(&self, msg: &str) -> Result<()> {
        debug!("committing changes with msg: {msg}");
        let config = self.repo.config()?.snapshot()?;
        let user = config.get_str("user.name")?;
        let email = config.get_str("user.email")?;
        debug!("using committer: user: {user}, email: {email}");
        let mut index = self.repo.index()?;
        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;
        let parent_commit = self.repo.head()?.peel_to_commit()?;
        let committer = git2::Signature::now(user, email)?;
        self.repo.commit(
            Some("HEAD"),
            &committer,
            &committer,
            msg,
            &tree,
            &[&parent_commit],
        )?;
        Ok(())
    }

    /// Push a local branch to `origin`, overwriting the remote branch.
    fn push_branch(&self, branch: &str) -> Result<()> {
        info!("pushing branch {branch}");
        let mut push_opts = git2::PushOptions::default();
        push_opts.remote_callbacks(self.remote_callbacks()?);

        let mut remote = self.repo.find_remote(DEFAULT_REMOTE)?;

        // + indicates "force" push
        let ref_spec = format!("+refs/heads/{branch}");
        remote.push(&[ref_spec], Some(&mut push_opts))?;

        Ok(())
    }

}
