//! Changelog command implementation.
use chrono::Local;
use log::*;
use std::path::Path;

use crate::{
    changelog::{CHANGELOG_FILE, ChangelogGenerator, ChangelogOutcome},
    cli,
    command::common,
    git::GitCli,
    npm::Npm,
    progress::Progress,
    result::Result,
    runner::ShellRunner,
};

/// Execute the changelog command for `project` in `--dir`.
pub fn execute(
    args: &cli::Args,
    project: &str,
    release_version: &str,
) -> Result<()> {
    let version = common::normalize_version(release_version)?;
    let config = common::load_configuration(&args.config)?;

    let runner = ShellRunner::new();
    let git = GitCli::new(&runner);
    let npm = Npm::new(&runner);

    let generator = ChangelogGenerator::new(
        &config,
        &git,
        &npm,
        common::clone_root(&args.config, &config),
    );

    let outcome =
        generate(&generator, &args.dir, project, &version, &Progress::root())?;

    if outcome == ChangelogOutcome::NothingToRelease {
        warn!("{project} has nothing to release");
    }

    Ok(())
}

/// Write the section for `version` of `project` into the `CHANGELOG.md` of
/// `dir`, dated today.
pub fn generate(
    generator: &ChangelogGenerator,
    dir: &Path,
    project: &str,
    version: &str,
    progress: &Progress,
) -> Result<ChangelogOutcome> {
    generator.update_changelog(
        project,
        version,
        &dir.join(CHANGELOG_FILE),
        Local::now().date_naive(),
        progress,
    )
}
