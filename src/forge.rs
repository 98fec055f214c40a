//! GitHub access for release lifecycle commands.
//!
//! Commands talk to the forge through the [`traits::Forge`] trait so the
//! release flows can be tested against a mock.

/// Connection settings for the forge.
pub mod config;

/// GitHub API client implementation.
pub mod github;

/// The forge abstraction used by commands.
pub mod traits;

/// Request and response types shared by forge implementations.
pub mod types;
