//! Markdown rendering of a release diff.
use chrono::NaiveDate;

use crate::changelog::{
    commit::Commit,
    types::{DependencyUpgrade, ReleaseDiff},
};

/// Blank lines separating a new section from the text above it.
const SECTION_SPACING: usize = 4;

/// Render the changelog section for `diff` released as `release_version` on
/// `today`. Output depends only on the arguments.
pub fn render(
    diff: &ReleaseDiff,
    release_version: &str,
    today: NaiveDate,
) -> Vec<String> {
    let mut lines = vec![String::new(); SECTION_SPACING];

    lines.push(format!(
        "## [{release_version}]({}/compare/{}...v{release_version}) - {}",
        diff.repository_url,
        diff.baseline.reference(),
        today.format("%Y-%m-%d")
    ));
    lines.push("### Changed".into());

    for commit in diff.commits.iter() {
        lines.push(format!(
            " - {} ({})",
            commit.message,
            reflink(&diff.repository_url, commit, None)
        ));
    }

    for upgrade in diff.upgrades.iter() {
        lines.push(upgrade_line(upgrade));

        for commit in upgrade.commits.iter() {
            lines.push(format!(
                "     - {} ({})",
                commit.message,
                reflink(&upgrade.repository_url, commit, Some(&upgrade.name))
            ));
        }
    }

    lines
}

/// Link to the commit's pull request when it has one, otherwise to the
/// commit itself. `origin` names the project the commit came from.
fn reflink(repository_url: &str, commit: &Commit, origin: Option<&str>) -> String {
    match (commit.pr_number, origin) {
        (Some(pr), None) => format!("[#{pr}]({repository_url}/pull/{pr})"),
        (Some(pr), Some(name)) => {
            format!("[{name}#{pr}]({repository_url}/pull/{pr})")
        }
        (None, None) => format!(
            "[{hash}]({repository_url}/commit/{hash})",
            hash = commit.hash
        ),
        (None, Some(name)) => format!(
            "[{name}@{hash}]({repository_url}/commit/{hash})",
            hash = commit.hash
        ),
    }
}

fn upgrade_line(upgrade: &DependencyUpgrade) -> String {
    format!(
        " - upgrade to [{name}@{new}]({url}/blob/master/CHANGELOG.md#{anchor}---{date}). Notable changes since {previous}:",
        name = upgrade.name,
        new = upgrade.new_version,
        url = upgrade.repository_url,
        anchor = upgrade.new_version.replace('.', ""),
        date = upgrade.release_date,
        previous = upgrade.previous_version,
    )
}
