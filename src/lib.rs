//! Release automation for a family of npm packages that live in separate
//! repositories.
//!
//! The core is [`changelog`]: for a project in the registry it clones every
//! transitive dependency, works out which of them were upgraded since the
//! project's last release and writes a changelog section covering both the
//! project's own commits and the notable changes of each upgraded
//! dependency. The [`command`] modules build the release lifecycle (stage,
//! upload, publish, delete) around it on top of GitHub.
pub mod changelog;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod forge;
pub mod git;
pub mod npm;
pub mod progress;
pub mod repo;
pub mod result;
pub mod runner;
pub mod version;
