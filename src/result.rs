//! Result type used throughout crossrelease.
//!
//! Errors are reported through `color-eyre`, which gives colorized output,
//! error chains and optional span traces. Domain failures are raised as
//! [`crate::error::ReleaseError`] and converted with `?`.
//!
//! ```rust,ignore
//! use color_eyre::eyre::Context;
//! use crate::result::Result;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     let content = std::fs::read_to_string(path)
//!         .wrap_err("Failed to read package.json")?;
//!     Ok(content)
//! }
//! ```

use color_eyre::eyre::Result as EyreResult;

/// Standard result type, an alias for `color_eyre::eyre::Result<T>`.
pub type Result<T> = EyreResult<T>;
