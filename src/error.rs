//! Domain error types for crossrelease.
//!
//! Functions return [`crate::result::Result`]; these variants are raised
//! where a failure has a name the caller may want to match on. They convert
//! into an `eyre::Report` with `?` and can be recovered with
//! `Report::downcast_ref::<ReleaseError>()`.

use thiserror::Error;

/// Main error type for release operations.
#[derive(Error, Debug)]
pub enum ReleaseError {
    // Cli args errors
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    // Checked before anything is mutated
    #[error("Precondition failed: {0}")]
    Precondition(String),

    // Tags, historical manifests and installs needed to compute a diff
    #[error("Unable to resolve release state: {0}")]
    Resolution(String),

    #[error("Changelog marker sentence not found in {0}")]
    MarkerNotFound(String),

    #[error("Command `{command}` failed in {cwd}: {stderr}")]
    CommandFailed {
        command: String,
        cwd: String,
        stderr: String,
    },

    // Forge errors
    #[error("Release {0} already exists")]
    ReleaseExists(String),

    #[error("Release {0} does not exist")]
    ReleaseNotFound(String),

    #[error("Forge operation failed: {0}")]
    Forge(String),

    #[error("GitHub API rate limit exceeded")]
    RateLimitExceeded,
}

impl ReleaseError {
    /// Create an invalid arguments error
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a forge error with context
    pub fn forge(msg: impl Into<String>) -> Self {
        Self::Forge(msg.into())
    }
}

// Implement From for octocrab errors (GitHub API)
impl From<octocrab::Error> for ReleaseError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. }
                if source.message.contains("rate limit") =>
            {
                Self::RateLimitExceeded
            }
            _ => Self::Forge(format!("GitHub API error: {}", err)),
        }
    }
}
