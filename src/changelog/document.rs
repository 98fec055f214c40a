//! Inserts rendered sections into `CHANGELOG.md`.
use color_eyre::eyre::Context;
use log::*;
use std::{fs, path::Path};

use crate::{error::ReleaseError, result::Result};

/// Sentence after which new sections are inserted. Newest releases end up
/// directly below the preamble.
pub const MARKER: &str = "this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html).";

/// Preamble of a new changelog.
pub const HEADER: &str = concat!(
    "# Changelog\n",
    "All notable changes to this project will be documented in this file.\n",
    "\n",
    "The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),\n",
    "and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html)."
);

const DEFAULT_LINE_ENDING: &str = "\r\n";

/// Insert `lines` after the marker sentence of the changelog at `path`,
/// creating the file with [`HEADER`] when it is missing or blank.
pub fn apply_changelog(path: &Path, lines: &[String]) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let content = if existing.trim().is_empty() {
        info!("writing new changelog to {}", path.display());
        HEADER.to_string()
    } else {
        existing
    };

    let updated = splice(&content, lines)
        .ok_or_else(|| ReleaseError::MarkerNotFound(path.display().to_string()))?;

    fs::write(path, updated)
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

/// Line ending used by `content`, judged from its first line break.
pub fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(i) if i > 0 && content.as_bytes()[i - 1] == b'\r' => "\r\n",
        Some(_) => "\n",
        None => DEFAULT_LINE_ENDING,
    }
}

/// `content` with `lines` inserted right after the first marker, or `None`
/// if there is no marker.
pub fn splice(content: &str, lines: &[String]) -> Option<String> {
    let at = content.find(MARKER)? + MARKER.len();
    let inserted = lines.join(line_ending(content));

    let mut updated = String::with_capacity(content.len() + inserted.len());
    updated.push_str(&content[..at]);
    updated.push_str(&inserted);
    updated.push_str(&content[at..]);

    Some(updated)
}
