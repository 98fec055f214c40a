//! Data types shared by the diff engine and the renderer.
use std::path::{Path, PathBuf};

use crate::{
    changelog::commit::Commit, config::ProjectConfig, error::ReleaseError,
    result::Result,
};

/// A dependency edge of a project and the versions resolved for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyRef {
    pub name: String,
    /// Version pinned by the parent at its previous release.
    pub previous_release_version: Option<String>,
    /// Version installed after refreshing to the latest published release.
    pub new_version: Option<String>,
}

impl DependencyRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// True once both versions are resolved and they differ.
    pub fn is_changed(&self) -> bool {
        match (&self.previous_release_version, &self.new_version) {
            (Some(previous), Some(new)) => previous != new,
            _ => false,
        }
    }
}

/// A project being diffed. Built from the registry at the start of a run and
/// filled in as the run progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub npm_name: String,
    pub repository_url: String,
    /// Where the project is cloned, once it has been.
    pub directory: Option<PathBuf>,
    pub dependencies: Vec<DependencyRef>,
    pub dev_dependencies: Vec<DependencyRef>,
    /// Changes to list in the changelog. Non-empty means a release is due.
    pub changes: Vec<Commit>,
}

impl Project {
    pub fn from_config(config: &ProjectConfig, org: &str) -> Self {
        Self {
            name: config.name.clone(),
            npm_name: config.npm_name().to_string(),
            repository_url: config.repository_url(org),
            directory: None,
            dependencies: config
                .dependencies
                .iter()
                .map(DependencyRef::new)
                .collect(),
            dev_dependencies: config
                .dev_dependencies
                .iter()
                .map(DependencyRef::new)
                .collect(),
            changes: vec![],
        }
    }

    /// Repository name: the last path segment of the project name.
    pub fn repo_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// The clone directory, or an error if the project was never cloned.
    pub fn directory(&self) -> Result<&Path> {
        self.directory.as_deref().ok_or_else(|| {
            ReleaseError::resolution(format!(
                "project {} has not been cloned",
                self.name
            ))
            .into()
        })
    }

    /// Dependencies followed by dev-dependencies.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &DependencyRef> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }
}

/// The point a project's changes are measured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// The latest stable release tag.
    Tag { name: String, version: String },
    /// No release yet: the repository's first commit.
    FirstCommit(String),
}

impl Baseline {
    /// Git revision of the baseline: the tag name or the commit hash.
    pub fn reference(&self) -> &str {
        match self {
            Baseline::Tag { name, .. } => name,
            Baseline::FirstCommit(hash) => hash,
        }
    }

    /// Version of the previous release, or the commit hash when there is
    /// none.
    pub fn previous_version(&self) -> &str {
        match self {
            Baseline::Tag { version, .. } => version,
            Baseline::FirstCommit(hash) => hash,
        }
    }
}

/// A dependency whose version moved since the parent's last release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpgrade {
    pub name: String,
    pub repository_url: String,
    pub previous_version: String,
    pub new_version: String,
    /// Date (`YYYY-MM-DD`) the new version was tagged.
    pub release_date: String,
    pub commits: Vec<Commit>,
}

/// Everything needed to render a changelog section for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDiff {
    pub project: String,
    pub repository_url: String,
    pub baseline: Baseline,
    /// The project's own commits since the baseline.
    pub commits: Vec<Commit>,
    /// Upgraded dependencies, in declaration order.
    pub upgrades: Vec<DependencyUpgrade>,
}
