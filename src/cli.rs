//! CLI argument parsing.
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::{env, path::PathBuf};

use crate::{config::DEFAULT_CONFIG_FILE, version::ReleaseType};

/// Environment variables consulted, in order, when no token flag is given.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    /// Path to the project registry.
    pub config: PathBuf,

    #[arg(long, default_value = ".", global = true)]
    /// Repository to operate on.
    pub dir: PathBuf,

    #[arg(long, default_value = "", global = true)]
    /// GitHub access token. Falls back to GH_TOKEN, then GITHUB_TOKEN.
    pub github_token: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Release operation subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a section for a release to CHANGELOG.md, covering the project's
    /// own changes and those of upgraded dependencies.
    Changelog {
        #[arg(long)]
        /// Registry name of the project.
        project: String,

        #[arg(long)]
        /// Version the section is written for.
        release_version: String,
    },

    /// Bump the version on a release branch, open a pull request and create
    /// a draft GitHub release.
    StageRelease {
        #[arg(long)]
        /// Branch the release is staged from and merged back into.
        branch: String,

        #[arg(long, value_enum)]
        /// Which part of the version to increment.
        release_type: ReleaseType,

        #[arg(long)]
        /// Registry name of the project. Enables changelog generation.
        project: Option<String>,

        #[arg(long, default_value_t = false)]
        /// Stage the release even when nothing changed.
        force: bool,
    },

    /// Replace the assets of the draft release for the current version with
    /// the built artifacts.
    UploadRelease {
        #[arg(long)]
        /// Release branch the artifacts were built from.
        branch: String,
    },

    /// Publish the draft release for the current version.
    PublishRelease {
        #[arg(long)]
        /// Release branch being published.
        branch: String,
    },

    /// Delete a release together with its pull request and branch.
    DeleteRelease {
        #[arg(long)]
        /// Version of the release to delete.
        release_version: String,
    },
}

impl Args {
    /// Token from `--github-token` or the environment.
    pub fn token(&self) -> Option<SecretString> {
        resolve_token(&self.github_token, |key| env::var(key).ok())
    }
}

/// First non-empty value of `flag` and [`TOKEN_ENV_VARS`] looked up with
/// `lookup`.
pub fn resolve_token(
    flag: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    if !flag.is_empty() {
        return Some(SecretString::from(flag.to_string()));
    }

    TOKEN_ENV_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .find(|value| !value.is_empty())
        .map(SecretString::from)
}
