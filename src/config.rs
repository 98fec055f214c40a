//! Loading and validation of the project registry (`crossrelease.toml`).
//!
//! The registry lists every project in the release family together with the
//! dependency edges between them. It is validated when loaded: names must be
//! unique and every dependency must name a registered project.
use color_eyre::eyre::Context;
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path, path::PathBuf};

use crate::{error::ReleaseError, result::Result};

pub mod graph;
pub mod project;

pub use project::ProjectConfig;

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "crossrelease.toml";
/// Default directory (relative to the registry file) for project clones.
pub const DEFAULT_CLONE_DIR: &str = ".tmp/.releases";
/// Default directory holding build artifacts to upload.
pub const DEFAULT_ARTIFACTS_DIR: &str = "out";
/// Default template for release and pull request bodies.
pub const DEFAULT_RELEASE_BODY: &str = "Release {{ version }}";

/// Settings for the GitHub release and pull request created when staging.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Tera template for release and PR bodies. Variables: `version`,
    /// `project`, `branch`.
    pub body: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            body: DEFAULT_RELEASE_BODY.into(),
        }
    }
}

/// Root configuration structure for `crossrelease.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// GitHub organization owning the projects. Used to derive repository
    /// URLs that are not configured explicitly.
    pub org: String,
    /// Directory where dependency projects are cloned. Emptied on every run.
    pub clone_dir: PathBuf,
    /// Directory containing build artifacts to upload to a release.
    pub artifacts_dir: PathBuf,
    /// Release and pull request settings.
    pub release: ReleaseConfig,
    /// Every project in the release family.
    #[serde(rename = "project")]
    pub projects: Vec<ProjectConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            org: "".into(),
            clone_dir: PathBuf::from(DEFAULT_CLONE_DIR),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            release: ReleaseConfig::default(),
            projects: vec![],
        }
    }
}

impl Config {
    /// Read, parse and validate the registry at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err_with(|| {
            format!("failed to read configuration file {}", path.display())
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a registry document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .wrap_err("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that names are unique and every dependency edge resolves.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();

        for project in self.projects.iter() {
            if project.name.trim().is_empty() {
                return Err(ReleaseError::invalid_config(
                    "project name must not be empty",
                )
                .into());
            }

            if !names.insert(project.name.as_str()) {
                return Err(ReleaseError::invalid_config(format!(
                    "project {} is defined more than once",
                    project.name
                ))
                .into());
            }

            if self.org.is_empty() && project.repository_url.is_none() {
                return Err(ReleaseError::invalid_config(format!(
                    "project {} has no repository_url and no org is configured",
                    project.name
                ))
                .into());
            }
        }

        for project in self.projects.iter() {
            for dependency in project.all_dependencies() {
                if dependency == &project.name {
                    return Err(ReleaseError::invalid_config(format!(
                        "project {} depends on itself",
                        project.name
                    ))
                    .into());
                }

                if !names.contains(dependency.as_str()) {
                    return Err(ReleaseError::invalid_config(format!(
                        "project {} depends on unknown project {}",
                        project.name, dependency
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Look up a project by name.
    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Repository URL for `project`, derived from the org when not set.
    pub fn repository_url(&self, project: &ProjectConfig) -> String {
        project.repository_url(&self.org)
    }
}
