//! Cross-project changelog generation.
//!
//! A run clones the target project and everything it transitively depends
//! on, works out what changed since the target's last release (its own
//! commits plus the commits of every upgraded dependency) and inserts a new
//! section into the target's `CHANGELOG.md`.
use chrono::NaiveDate;
use color_eyre::eyre::Context;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::{Config, graph::collect_dependencies},
    error::ReleaseError,
    git::SourceControl,
    npm::PackageManager,
    progress::Progress,
    result::Result,
};

mod commit;
mod diff;
mod document;
mod render;
mod types;

pub use commit::{Commit, parse_line, parse_log};
pub use diff::{ReleaseDiffEngine, version_ref};
pub use document::{HEADER, MARKER, apply_changelog};
pub use render::render;
pub use types::{Baseline, DependencyRef, DependencyUpgrade, Project, ReleaseDiff};

/// Name of the changelog document in a project.
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Result of a changelog run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogOutcome {
    /// No commits and no dependency upgrades since the last release. The
    /// changelog was left untouched.
    NothingToRelease,
    /// The rendered lines were inserted into the changelog.
    Updated { lines: Vec<String> },
}

pub struct ChangelogGenerator<'a> {
    config: &'a Config,
    scm: &'a dyn SourceControl,
    pm: &'a dyn PackageManager,
    /// Directory dependency projects are cloned into. Emptied on every run.
    clone_root: PathBuf,
}

impl<'a> ChangelogGenerator<'a> {
    pub fn new(
        config: &'a Config,
        scm: &'a dyn SourceControl,
        pm: &'a dyn PackageManager,
        clone_root: PathBuf,
    ) -> Self {
        Self {
            config,
            scm,
            pm,
            clone_root,
        }
    }

    /// Add a section for `release_version` of `project_name` to the
    /// changelog at `changelog_path`, dated `today`.
    pub fn update_changelog(
        &self,
        project_name: &str,
        release_version: &str,
        changelog_path: &Path,
        today: NaiveDate,
        progress: &Progress,
    ) -> Result<ChangelogOutcome> {
        progress.info(format!("Updating changelog for project {project_name}"));
        let progress = progress.nested();

        self.reset_clone_root(&progress)?;

        progress.info("Getting all project dependencies");
        let mut projects = collect_dependencies(self.config, project_name)?
            .into_iter()
            .map(|p| Project::from_config(p, &self.config.org))
            .collect::<Vec<Project>>();

        progress.info("Cloning projects");
        for project in projects.iter_mut() {
            self.clone_project(project, &progress.nested())?;
        }

        let Some((project, dependencies)) = projects.split_first_mut() else {
            return Err(ReleaseError::UnknownProject(project_name.into()).into());
        };

        let engine = ReleaseDiffEngine::new(self.scm, self.pm, dependencies);
        let diff = engine.compute(project, &progress)?;

        if project.changes.is_empty() {
            progress.info("Nothing has changed since last release");
            return Ok(ChangelogOutcome::NothingToRelease);
        }

        let lines = render(&diff, release_version, today);
        for line in lines.iter().filter(|l| !l.is_empty()) {
            progress.debug(line);
        }

        apply_changelog(changelog_path, &lines)?;
        progress.info(format!("Updated {}", changelog_path.display()));

        Ok(ChangelogOutcome::Updated { lines })
    }

    fn reset_clone_root(&self, progress: &Progress) -> Result<()> {
        progress.info(format!(
            "Creating clone directory {}",
            self.clone_root.display()
        ));

        if self.clone_root.exists() {
            fs::remove_dir_all(&self.clone_root).wrap_err_with(|| {
                format!("failed to empty {}", self.clone_root.display())
            })?;
        }

        fs::create_dir_all(&self.clone_root).wrap_err_with(|| {
            format!("failed to create {}", self.clone_root.display())
        })?;

        Ok(())
    }

    fn clone_project(&self, project: &mut Project, progress: &Progress) -> Result<()> {
        let dest = self.clone_root.join(project.repo_name());

        progress.info(format!(
            "Cloning {} into {}",
            project.repository_url,
            dest.display()
        ));

        self.scm.clone_repository(&project.repository_url, &dest)?;
        project.directory = Some(dest);

        Ok(())
    }
}
