//! Stage release command implementation.
//!
//! Bumps the package version on a fresh `release/<version>` branch, pushes
//! it, and opens a draft GitHub release plus a pull request back into the
//! base branch. When a registry project is named, its changelog is updated
//! first and an empty release stops the run unless forced.
use log::*;
use std::path::Path;

use crate::{
    changelog::{CHANGELOG_FILE, ChangelogGenerator, ChangelogOutcome},
    cli,
    command::{changelog, common},
    config::Config,
    error::ReleaseError,
    forge::{
        traits::Forge,
        types::{CreatePrRequest, CreateReleaseRequest, PullRequest, ReleaseInfo},
    },
    git::{GitCli, SourceControl},
    npm::{Npm, PACKAGE_JSON, PACKAGE_LOCK_JSON, PackageManager},
    progress::Progress,
    repo::LocalRepository,
    result::Result,
    runner::ShellRunner,
    version::{ReleaseType, increment, parse_version},
};

/// Options of a stage-release run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRequest {
    /// Branch the release starts from and is merged back into.
    pub branch: String,
    pub release_type: ReleaseType,
    /// Registry project whose changelog is updated.
    pub project: Option<String>,
    /// Stage even when the changelog reports nothing to release.
    pub force: bool,
}

/// Result of a stage-release run.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    NothingToRelease,
    Staged {
        version: String,
        release: ReleaseInfo,
        pr: PullRequest,
    },
}

/// Collaborators a release is staged with.
pub struct Stager<'a> {
    pub config: &'a Config,
    /// Work tree of the repository being released.
    pub workdir: &'a Path,
    /// Directory projects are cloned into for the changelog.
    pub clone_root: &'a Path,
    /// Project name used in body templates when none is given.
    pub name: &'a str,
    pub repo: &'a dyn LocalRepository,
    pub forge: &'a dyn Forge,
    pub scm: &'a dyn SourceControl,
    pub pm: &'a dyn PackageManager,
}

/// Execute the stage-release command.
pub async fn execute(args: &cli::Args, request: StageRequest) -> Result<()> {
    let ctx = common::ReleaseContext::load(args)?;
    let name = ctx.name();
    let clone_root = common::clone_root(&args.config, &ctx.config);

    let runner = ShellRunner::new();
    let git = GitCli::new(&runner);
    let npm = Npm::new(&runner);

    let stager = Stager {
        config: &ctx.config,
        workdir: &ctx.workdir,
        clone_root: &clone_root,
        name: &name,
        repo: &ctx.repo,
        forge: ctx.forge.as_ref(),
        scm: &git,
        pm: &npm,
    };

    match stager.stage(&request, &Progress::root()).await? {
        StageOutcome::NothingToRelease => {
            warn!("nothing to release: use --force to stage anyway");
        }
        StageOutcome::Staged { version, pr, .. } => {
            info!("staged release {version} in pull request #{}", pr.number);
        }
    }

    Ok(())
}

impl Stager<'_> {
    pub async fn stage(
        &self,
        request: &StageRequest,
        progress: &Progress,
    ) -> Result<StageOutcome> {
        progress.info(format!(
            "Staging release: type {}, branch {}",
            request.release_type, request.branch
        ));
        let progress = progress.nested();

        self.check_preconditions(&request.branch, &progress)?;

        let version = self.next_version(request.release_type, &progress)?;

        progress.info(format!("Checking that release {version} does not exist"));
        if common::find_release(self.forge, &version).await?.is_some() {
            return Err(ReleaseError::ReleaseExists(version).into());
        }

        let mut paths = vec![PACKAGE_JSON.to_string(), PACKAGE_LOCK_JSON.to_string()];

        if let Some(project) = &request.project {
            let generator = ChangelogGenerator::new(
                self.config,
                self.scm,
                self.pm,
                self.clone_root.to_path_buf(),
            );
            let outcome = changelog::generate(
                &generator,
                self.workdir,
                project,
                &version,
                &progress,
            )?;

            match outcome {
                ChangelogOutcome::NothingToRelease if !request.force => {
                    progress.warn(format!("{project} has nothing to release"));
                    return Ok(StageOutcome::NothingToRelease);
                }
                ChangelogOutcome::NothingToRelease => {
                    progress.info("Nothing to release, staging anyway");
                }
                ChangelogOutcome::Updated { .. } => {
                    paths.push(CHANGELOG_FILE.to_string());
                }
            }
        }

        let release_branch = common::release_branch(&version);
        self.commit_release_branch(&release_branch, &version, &paths, &progress)?;

        let project = request.project.as_deref().unwrap_or(self.name);
        let body = common::render_body(
            &self.config.release.body,
            &version,
            project,
            &request.branch,
        )?;

        progress.info(format!("Creating GitHub release {version}"));
        let release = self
            .forge
            .create_draft_release(CreateReleaseRequest {
                tag: common::release_tag(&version),
                name: version.clone(),
                body: body.clone(),
            })
            .await?;

        progress.info(format!(
            "Creating pull request {release_branch} -> {}",
            request.branch
        ));
        let pr = self
            .forge
            .create_pr(CreatePrRequest {
                head_branch: release_branch,
                base_branch: request.branch.clone(),
                title: version.clone(),
                body,
            })
            .await?;

        Ok(StageOutcome::Staged {
            version,
            release,
            pr,
        })
    }

    fn check_preconditions(&self, branch: &str, progress: &Progress) -> Result<()> {
        progress.info("Checking for a clean repository");
        if !self.repo.is_clean()? {
            return Err(ReleaseError::precondition("Repository is not clean").into());
        }

        progress.info(format!("Checking out branch {branch}"));
        self.repo.switch_branch(branch)?;

        progress.info("Fetching all branches");
        self.repo.fetch()?;

        Ok(())
    }

    fn next_version(
        &self,
        release_type: ReleaseType,
        progress: &Progress,
    ) -> Result<String> {
        let current = common::package_version(self.pm, self.workdir)?;
        let next = parse_version(&current)
            .map(|v| increment(&v, release_type).to_string())
            .unwrap_or_default();

        if next.is_empty() {
            return Err(ReleaseError::resolution(format!(
                "unable to increment version {current}"
            ))
            .into());
        }

        progress.info(format!("Next version: {current} -> {next}"));
        Ok(next)
    }

    fn commit_release_branch(
        &self,
        release_branch: &str,
        version: &str,
        paths: &[String],
        progress: &Progress,
    ) -> Result<()> {
        progress.info(format!("Creating release branch {release_branch}"));
        self.repo.create_branch(release_branch)?;
        self.repo.switch_branch(release_branch)?;

        progress.info(format!("Setting package version to {version}"));
        self.pm.set_version(self.workdir, version)?;

        self.repo.add_paths(paths)?;
        self.repo.commit(&format!("Increment version to {version}"))?;

        progress.info(format!("Pushing {release_branch}"));
        self.repo.push_branch(release_branch)?;

        Ok(())
    }
}
