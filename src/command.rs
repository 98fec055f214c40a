//! Command execution for crossrelease.
//!
//! Each CLI subcommand has a module with an `execute` entry point that wires
//! the real collaborators (shell runner, git, npm, GitHub) together, plus a
//! function taking those collaborators as trait objects that does the work
//! and can be tested with mocks.
//!
//! # Release lifecycle
//!
//! 1. **stage**: bump the version on `release/<version>`, optionally write
//!    the changelog, push, open a pull request and a draft release
//! 2. **upload**: replace the draft release's assets with the built
//!    artifacts
//! 3. **publish**: mark the draft release as published
//! 4. **delete**: remove a staged release, its pull request and branch
//!
//! **changelog** runs the cross-project changelog generation on its own.

/// Changelog generation for a registry project.
pub mod changelog;

/// Helpers shared by the lifecycle commands.
pub mod common;

/// Release, pull request and branch removal.
pub mod delete;

/// Draft release publication.
pub mod publish;

/// Release staging.
pub mod stage;

/// Release asset upload.
pub mod upload;
