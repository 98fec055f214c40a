//! Delete release command implementation.
//!
//! Removes every trace of a staged release: the GitHub release, the pull
//! request from its release branch and the branch itself. Parts that are
//! already gone are skipped.
use log::*;

use crate::{
    cli, command::common, forge::traits::Forge, progress::Progress,
    result::Result,
};

/// What a delete-release run removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub release: bool,
    pub pull_request: Option<u64>,
    pub branch: bool,
}

/// Execute the delete-release command.
pub async fn execute(args: &cli::Args, release_version: &str) -> Result<()> {
    let version = common::normalize_version(release_version)?;
    let ctx = common::ReleaseContext::load(args)?;

    let outcome =
        delete_release(ctx.forge.as_ref(), &version, &Progress::root()).await?;

    if outcome == DeleteOutcome::default() {
        warn!("nothing found to delete for release {version}");
    }

    Ok(())
}

pub async fn delete_release(
    forge: &dyn Forge,
    version: &str,
    progress: &Progress,
) -> Result<DeleteOutcome> {
    progress.info(format!("Deleting release {version}"));
    let progress = progress.nested();
    let mut outcome = DeleteOutcome::default();

    match common::find_release(forge, version).await? {
        Some(release) => {
            forge.delete_release(release.id).await?;
            progress.info(format!("Deleted release {version}"));
            outcome.release = true;
        }
        None => progress.warn(format!("release {version} does not exist")),
    }

    let branch = common::release_branch(version);

    if let Some(pr) = forge.find_open_pr(branch.clone()).await? {
        forge.close_pr(pr.number).await?;
        progress.info(format!("Closed pull request #{}", pr.number));
        outcome.pull_request = Some(pr.number);
    } else {
        progress.info(format!("No open pull request from {branch}"));
    }

    outcome.branch = forge.delete_branch(branch.clone()).await?;
    if outcome.branch {
        progress.info(format!("Deleted branch {branch}"));
    } else {
        progress.info(format!("Branch {branch} does not exist"));
    }

    Ok(outcome)
}
