//! Publish release command implementation.
use log::*;

use crate::{
    cli, command::common, forge::traits::Forge, npm::Npm, progress::Progress,
    result::Result, runner::ShellRunner,
};

/// Execute the publish-release command.
pub async fn execute(args: &cli::Args, branch: &str) -> Result<()> {
    let ctx = common::ReleaseContext::load(args)?;
    let runner = ShellRunner::new();
    let npm = Npm::new(&runner);

    let progress = Progress::root();
    progress.info(format!("Publishing release from branch {branch}"));

    let version = common::package_version(&npm, &ctx.workdir)?;

    if publish_release(ctx.forge.as_ref(), &version, &progress.nested()).await? {
        info!("published release {version}");
    }

    Ok(())
}

/// Mark the draft release `version` as published. Returns false if it was
/// already published.
pub async fn publish_release(
    forge: &dyn Forge,
    version: &str,
    progress: &Progress,
) -> Result<bool> {
    progress.info(format!("Finding release {version}"));
    let release = common::require_release(forge, version).await?;

    if !release.draft {
        progress.warn(format!("release {version} is already published"));
        return Ok(false);
    }

    forge.publish_release(release.id).await?;
    Ok(true)
}
