//! Upload release command implementation.
use color_eyre::eyre::Context;
use log::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    cli,
    command::common,
    forge::{traits::Forge, types::UploadAssetRequest},
    npm::Npm,
    progress::Progress,
    result::Result,
    runner::ShellRunner,
};

/// Execute the upload-release command.
pub async fn execute(args: &cli::Args, branch: &str) -> Result<()> {
    let ctx = common::ReleaseContext::load(args)?;
    let runner = ShellRunner::new();
    let npm = Npm::new(&runner);

    let progress = Progress::root();
    progress.info(format!("Uploading release from branch {branch}"));

    let version = common::package_version(&npm, &ctx.workdir)?;
    let artifacts_dir = ctx.workdir.join(&ctx.config.artifacts_dir);

    let uploaded = upload_release(
        ctx.forge.as_ref(),
        &version,
        &artifacts_dir,
        &progress.nested(),
    )
    .await?;

    info!("uploaded {uploaded} assets to release {version}");
    Ok(())
}

/// Files in `dir` whose name starts with `version`, sorted by name.
pub fn find_artifacts(dir: &Path, version: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).wrap_err_with(|| {
        format!("failed to read artifacts directory {}", dir.display())
    })?;

    let mut artifacts = vec![];

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if entry.file_name().to_string_lossy().starts_with(version) {
            artifacts.push(path);
        }
    }

    artifacts.sort();
    Ok(artifacts)
}

/// Replace every asset of release `version` with the matching artifacts in
/// `artifacts_dir`. Returns the number of uploaded files.
pub async fn upload_release(
    forge: &dyn Forge,
    version: &str,
    artifacts_dir: &Path,
    progress: &Progress,
) -> Result<usize> {
    progress.info(format!("Finding release {version}"));
    let release = common::require_release(forge, version).await?;

    progress.info(format!(
        "Deleting {} existing assets",
        release.assets.len()
    ));
    for asset in &release.assets {
        forge.delete_release_asset(asset.id).await?;
        progress.nested().debug(format!("deleted asset {}", asset.name));
    }

    let artifacts = find_artifacts(artifacts_dir, version)?;

    if artifacts.is_empty() {
        progress.warn(format!(
            "no artifacts for {version} found in {}",
            artifacts_dir.display()
        ));
        return Ok(0);
    }

    progress.info("Uploading artifacts");
    for path in &artifacts {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let content = tokio::fs::read(path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;

        forge
            .upload_release_asset(UploadAssetRequest {
                upload_url: release.upload_url.clone(),
                name: name.clone(),
                content,
            })
            .await?;

        progress.nested().info(format!("Uploaded asset {name}"));
    }

    Ok(artifacts.len())
}
