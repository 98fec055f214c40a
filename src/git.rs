//! Source-control queries needed to diff a project between two releases.
//!
//! [`GitCli`] answers them by shelling out to `git` through a
//! [`CommandRunner`]. Historical reads (`show_file`) are not cached: every
//! call goes back to git.
#[cfg(test)]
use mockall::automock;
use regex::Regex;
use std::path::Path;

use crate::{result::Result, runner::CommandRunner};

#[cfg_attr(test, automock)]
pub trait SourceControl {
    /// All tag names in the repository at `dir`.
    fn list_tags(&self, dir: &Path) -> Result<Vec<String>>;

    /// Content of `path` as it existed at `revision`.
    fn show_file(&self, dir: &Path, revision: &str, path: &str)
    -> Result<String>;

    /// Raw `--oneline` log of the first-parent chain between two revisions.
    fn log_first_parent(&self, dir: &Path, from: &str, to: &str)
    -> Result<String>;

    /// Hash of the repository's first (root) commit.
    fn first_commit(&self, dir: &Path) -> Result<String>;

    /// Clone `url` into `dest`, fetching all branches.
    fn clone_repository(&self, url: &str, dest: &Path) -> Result<()>;

    /// Commit date (`YYYY-MM-DD`) of the commit `tag` points at, if the tag
    /// exists.
    fn tag_date(&self, dir: &Path, tag: &str) -> Result<Option<String>>;
}

/// [`SourceControl`] backed by the `git` command line.
pub struct GitCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> GitCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl SourceControl for GitCli<'_> {
    fn list_tags(&self, dir: &Path) -> Result<Vec<String>> {
        let output = self.runner.run("git tag --sort version:refname", dir)?;
        Ok(output
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    fn show_file(
        &self,
        dir: &Path,
        revision: &str,
        path: &str,
    ) -> Result<String> {
        self.runner
            .run(&format!("git show {revision}:{path}"), dir)
    }

    fn log_first_parent(
        &self,
        dir: &Path,
        from: &str,
        to: &str,
    ) -> Result<String> {
        self.runner.run(
            &format!("git log {from}...{to} --oneline --first-parent"),
            dir,
        )
    }

    fn first_commit(&self, dir: &Path) -> Result<String> {
        let output = self.runner.run("git rev-list --max-parents=0 HEAD", dir)?;
        // repositories with several roots list them all: use the first
        Ok(output.lines().next().unwrap_or_default().trim().to_string())
    }

    fn clone_repository(&self, url: &str, dest: &Path) -> Result<()> {
        let cwd = dest.parent().unwrap_or(Path::new("."));
        self.runner.run(
            &format!(
                "git clone --no-single-branch \"{url}\" \"{}\"",
                dest.display()
            ),
            cwd,
        )?;
        Ok(())
    }

    fn tag_date(&self, dir: &Path, tag: &str) -> Result<Option<String>> {
        let output = self.runner.run(
            "git log --tags --simplify-by-decoration --pretty=\"format:%ci %d\"",
            dir,
        )?;
        find_tag_date(&output, tag)
    }
}

/// Find the date of `tag` in decorated log output where each line reads
/// `2024-03-01 10:22:03 -0500  (tag: v1.2.0, origin/master)`.
fn find_tag_date(log_output: &str, tag: &str) -> Result<Option<String>> {
    let pattern = format!(
        r"(?m)^(\d{{4}}-\d{{2}}-\d{{2}}).*?tag:[ \t]*{}(?:,|\))",
        regex::escape(tag)
    );
    let re = Regex::new(&pattern)?;

    Ok(re
        .captures(log_output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockCommandRunner;
    use mockall::predicate::eq;

    const DECORATED_LOG: &str = "\
2024-05-02 09:00:00 -0400  (HEAD -> master, tag: v2.1.0, origin/master)
2024-04-10 12:30:00 -0400  (tag: v2.0.10)
2024-03-01 08:15:00 -0500  (tag: v2.0.1)
2024-01-20 17:45:00 -0500  (tag: v2.0.0)";

    #[test]
    fn finds_tag_dates() {
        assert_eq!(
            find_tag_date(DECORATED_LOG, "v2.1.0").unwrap(),
            Some("2024-05-02".to_string())
        );
        assert_eq!(
            find_tag_date(DECORATED_LOG, "v2.0.0").unwrap(),
            Some("2024-01-20".to_string())
        );
    }

    #[test]
    fn tag_date_does_not_match_longer_tags() {
        assert_eq!(
            find_tag_date(DECORATED_LOG, "v2.0.1").unwrap(),
            Some("2024-03-01".to_string())
        );
        assert_eq!(find_tag_date(DECORATED_LOG, "v2.0.11").unwrap(), None);
        assert_eq!(find_tag_date(DECORATED_LOG, "v2x1x0").unwrap(), None);
    }

    #[test]
    fn lists_tags_skipping_blank_lines() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| cmd == "git tag --sort version:refname")
            .returning(|_, _| Ok("v1.0.0\n\n v1.1.0 \nlatest".into()));

        let git = GitCli::new(&runner);
        let tags = git.list_tags(Path::new("/repo")).unwrap();
        assert_eq!(tags, vec!["v1.0.0", "v1.1.0", "latest"]);
    }

    #[test]
    fn logs_first_parent_range() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(
                eq("git log v1.0.0...HEAD --oneline --first-parent"),
                eq(Path::new("/repo")),
            )
            .returning(|_, _| Ok("abc123 fix: bug".into()));

        let git = GitCli::new(&runner);
        let log = git
            .log_first_parent(Path::new("/repo"), "v1.0.0", "HEAD")
            .unwrap();
        assert_eq!(log, "abc123 fix: bug");
    }

    #[test]
    fn shows_file_at_revision() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| cmd == "git show v1.0.0:package.json")
            .returning(|_, _| Ok("{}".into()));

        let git = GitCli::new(&runner);
        let content = git
            .show_file(Path::new("/repo"), "v1.0.0", "package.json")
            .unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn first_commit_uses_first_root() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| cmd == "git rev-list --max-parents=0 HEAD")
            .returning(|_, _| Ok("aaa111\nbbb222".into()));

        let git = GitCli::new(&runner);
        assert_eq!(git.first_commit(Path::new("/repo")).unwrap(), "aaa111");
    }

    #[test]
    fn clones_into_destination_parent() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, cwd| {
                cmd == "git clone --no-single-branch \"https://github.com/org/lib\" \"/tmp/clones/lib\""
                    && cwd == Path::new("/tmp/clones")
            })
            .returning(|_, _| Ok(String::new()));

        let git = GitCli::new(&runner);
        git.clone_repository(
            "https://github.com/org/lib",
            Path::new("/tmp/clones/lib"),
        )
        .unwrap();
    }
}
