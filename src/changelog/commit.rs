//! Parser for `git log --oneline` output.
//!
//! Each line is read with this grammar:
//!
//! ```text
//! line        := hash [ws branch-info] [ws] message [ws pr-ref]
//! hash        := [0-9a-z]+        followed by whitespace or end of line
//! branch-info := "(" text ")"     text runs to the first ")" and must not
//!                                 start with "#"
//! pr-ref      := "(#" digits ")"  at the very end of the line
//! ```
//!
//! A line that does not start with a hash keeps its whole text as the
//! message. Release bookkeeping commits (bare version numbers and
//! "update changelog for ..." messages) are dropped from parsed logs.
use crate::version::is_valid_version;

const CHANGELOG_COMMIT_PREFIX: &str = "update changelog for ";

/// A single commit from a one-line log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    /// Decoration printed after the hash, e.g. `HEAD -> master, tag: v1.0.0`.
    pub branch_info: Option<String>,
    pub message: String,
    pub pr_number: Option<u64>,
}

impl Commit {
    /// True for commits that only record a release: a bare version message
    /// or a changelog update.
    pub fn is_release_bookkeeping(&self) -> bool {
        is_valid_version(&self.message)
            || self
                .message
                .to_lowercase()
                .starts_with(CHANGELOG_COMMIT_PREFIX)
    }
}

/// Parse raw log output into commits, skipping blank lines and release
/// bookkeeping. Order is preserved.
pub fn parse_log(raw: &str) -> Vec<Commit> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .filter(|commit| !commit.is_release_bookkeeping())
        .collect()
}

/// Parse a single log line. Never fails: unrecognised lines become a commit
/// with only a message.
pub fn parse_line(line: &str) -> Commit {
    let line = line.trim();

    let Some((hash, rest)) = split_hash(line) else {
        return Commit {
            message: line.to_string(),
            ..Default::default()
        };
    };

    let (branch_info, rest) = split_branch_info(rest);
    let (message, pr_number) = split_pr_number(rest);

    Commit {
        hash: hash.to_string(),
        branch_info: branch_info.map(|b| b.to_string()),
        message: message.to_string(),
        pr_number,
    }
}

fn split_hash(line: &str) -> Option<(&str, &str)> {
    let end = line
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .unwrap_or(line.len());

    if end == 0 {
        return None;
    }

    let (hash, rest) = line.split_at(end);

    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    Some((hash, rest.trim_start()))
}

fn split_branch_info(rest: &str) -> (Option<&str>, &str) {
    if let Some(inner) = rest.strip_prefix('(')
        && !inner.starts_with('#')
        && let Some(close) = inner.find(')')
    {
        return (Some(&inner[..close]), inner[close + 1..].trim_start());
    }

    (None, rest)
}

fn split_pr_number(rest: &str) -> (&str, Option<u64>) {
    let trimmed = rest.trim_end();

    if let Some(body) = trimmed.strip_suffix(')')
        && let Some(open) = body.rfind("(#")
    {
        let digits = &body[open + 2..];
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && let Ok(number) = digits.parse::<u64>()
        {
            return (body[..open].trim_end(), Some(number));
        }
    }

    (trimmed, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commit() {
        let commit = parse_line("abc123 fix: bug");
        assert_eq!(
            commit,
            Commit {
                hash: "abc123".into(),
                branch_info: None,
                message: "fix: bug".into(),
                pr_number: None,
            }
        );
    }

    #[test]
    fn parses_pr_number() {
        let commit = parse_line("def456 feat: thing (#42)");
        assert_eq!(commit.hash, "def456");
        assert_eq!(commit.message, "feat: thing");
        assert_eq!(commit.pr_number, Some(42));
    }

    #[test]
    fn parses_branch_info() {
        let commit =
            parse_line("0a1b2c3 (HEAD -> master, tag: v1.2.0) Bump deps (#7)");
        assert_eq!(commit.hash, "0a1b2c3");
        assert_eq!(
            commit.branch_info.as_deref(),
            Some("HEAD -> master, tag: v1.2.0")
        );
        assert_eq!(commit.message, "Bump deps");
        assert_eq!(commit.pr_number, Some(7));
    }

    #[test]
    fn pr_reference_must_end_the_line() {
        let commit = parse_line("abc123 revert (#12) and more");
        assert_eq!(commit.message, "revert (#12) and more");
        assert_eq!(commit.pr_number, None);
    }

    #[test]
    fn non_numeric_pr_reference_stays_in_message() {
        let commit = parse_line("abc123 fix parsing (#abc)");
        assert_eq!(commit.message, "fix parsing (#abc)");
        assert_eq!(commit.pr_number, None);
    }

    #[test]
    fn hash_only_line_has_empty_message() {
        let commit = parse_line("abc123");
        assert_eq!(commit.hash, "abc123");
        assert_eq!(commit.message, "");
        assert_eq!(commit.pr_number, None);
    }

    #[test]
    fn pr_reference_right_after_hash_is_not_branch_info() {
        let commit = parse_line("abc123 (#42)");
        assert_eq!(commit.branch_info, None);
        assert_eq!(commit.message, "");
        assert_eq!(commit.pr_number, Some(42));
    }

    #[test]
    fn unparseable_line_becomes_message() {
        let commit = parse_line("* Merge branch 'master'");
        assert_eq!(commit.hash, "");
        assert_eq!(commit.branch_info, None);
        assert_eq!(commit.message, "* Merge branch 'master'");
        assert_eq!(commit.pr_number, None);

        let commit = parse_line("ABC123 upper-case is not a hash");
        assert_eq!(commit.hash, "");
        assert_eq!(commit.message, "ABC123 upper-case is not a hash");
    }

    #[test]
    fn parse_log_skips_blank_lines_and_keeps_order() {
        let raw = "\n bbb222 second\n\naaa111 first (#3)\r\n  \n";
        let commits = parse_log(raw);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "bbb222");
        assert_eq!(commits[1].hash, "aaa111");
        assert_eq!(commits[1].pr_number, Some(3));
    }

    #[test]
    fn parse_log_drops_release_bookkeeping_only() {
        let raw = "\
a1 2.1.0
a2 v2.1.0
a3 Update changelog for 2.1.0
a4 update CHANGELOG FOR v2.0.0 (#9)
a5 fix: keep me
a6 Increment version to 2.1.0
a7 docs: update changelog format";
        let messages = parse_log(raw)
            .into_iter()
            .map(|c| c.message)
            .collect::<Vec<String>>();
        assert_eq!(
            messages,
            vec![
                "fix: keep me",
                "Increment version to 2.1.0",
                "docs: update changelog format"
            ]
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let raw = "abc123 (tag: v1.0.0) feat: x (#1)\ndef456 fix: y";
        assert_eq!(parse_log(raw), parse_log(raw));
    }
}
