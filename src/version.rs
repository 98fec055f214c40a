//! Semantic version helpers used to pick release tags and bump versions.
//!
//! Versions are parsed loosely the way npm tags are written: surrounding
//! whitespace, a leading `=` and a leading `v` are accepted, so `v1.2.3`
//! and `1.2.3` name the same version.
use clap::ValueEnum;
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt::Display;

/// Which component of the version a release increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
}

impl Display for ReleaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseType::Major => f.write_str("major"),
            ReleaseType::Minor => f.write_str("minor"),
            ReleaseType::Patch => f.write_str("patch"),
        }
    }
}

/// Parse a version string, tolerating a leading `=` or `v`.
pub fn parse_version(value: &str) -> Option<Version> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// True if `value` parses as a semantic version.
pub fn is_valid_version(value: &str) -> bool {
    parse_version(value).is_some()
}

/// Returns the tag with the highest semver precedence, ignoring tags that are
/// not versions and tags with a pre-release component.
///
/// The returned string is the tag exactly as given (e.g. `v1.2.0`).
pub fn latest_stable_tag<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_ref().trim();
            parse_version(tag)
                .filter(|version| version.pre.is_empty())
                .map(|version| (tag, version))
        })
        .max_by(|(_, a), (_, b)| a.cmp_precedence(b))
        .map(|(tag, _)| tag.to_string())
}

/// Increment a version the way `npm version <type>` does.
///
/// A pre-release is promoted to its release when the component being
/// incremented is already the one the pre-release leads up to.
pub fn increment(version: &Version, release_type: ReleaseType) -> Version {
    let is_prerelease = !version.pre.is_empty();

    let mut next = match release_type {
        ReleaseType::Major => {
            if is_prerelease && version.minor == 0 && version.patch == 0 {
                Version::new(version.major, 0, 0)
            } else {
                Version::new(version.major + 1, 0, 0)
            }
        }
        ReleaseType::Minor => {
            if is_prerelease && version.patch == 0 {
                Version::new(version.major, version.minor, 0)
            } else {
                Version::new(version.major, version.minor + 1, 0)
            }
        }
        ReleaseType::Patch => {
            if is_prerelease {
                Version::new(version.major, version.minor, version.patch)
            } else {
                Version::new(version.major, version.minor, version.patch + 1)
            }
        }
    };

    next.pre = Prerelease::EMPTY;
    next.build = BuildMetadata::EMPTY;
    next
}
