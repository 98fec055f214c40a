//! Indented progress logging.
//!
//! A [`Progress`] value is handed down the call stack by reference. Each
//! nested operation calls [`Progress::nested`] to get a child one level
//! deeper, so the indentation follows call depth instead of a shared
//! counter.
use log::*;
use std::fmt::Display;

/// Character repeated to build the indent prefix.
const INDENT_CHAR: &str = ".";
/// Number of indent characters per nesting level.
const INDENT_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    depth: usize,
}

impl Progress {
    /// Top level context with no indentation.
    pub fn root() -> Self {
        Self::default()
    }

    /// Child context indented one level deeper than `self`.
    pub fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
        }
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.depth
    }

    pub fn prefix(&self) -> String {
        INDENT_CHAR.repeat(self.depth * INDENT_WIDTH)
    }

    /// Apply the indent prefix to a message.
    pub fn format(&self, msg: impl Display) -> String {
        if self.depth == 0 {
            return msg.to_string();
        }
        format!("{} {msg}", self.prefix())
    }

    pub fn info(&self, msg: impl Display) {
        info!("{}", self.format(msg));
    }

    pub fn debug(&self, msg: impl Display) {
        debug!("{}", self.format(msg));
    }

    pub fn warn(&self, msg: impl Display) {
        warn!("{}", self.format(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_prefix() {
        let progress = Progress::root();
        assert_eq!(progress.depth(), 0);
        assert_eq!(progress.format("cloning"), "cloning");
    }

    #[test]
    fn nesting_adds_four_dots_per_level() {
        let progress = Progress::root().nested().nested();
        assert_eq!(progress.prefix(), "........");
        assert_eq!(progress.format("cloning"), "........ cloning");
    }

    #[test]
    fn nesting_does_not_change_parent() {
        let parent = Progress::root().nested();
        let child = parent.nested();
        assert_eq!(parent.depth(), 1);
        assert_eq!(child.depth(), 2);
    }
}
