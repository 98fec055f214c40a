//! Computes what changed in a project since its last release.
//!
//! The project's own first-parent history since the baseline is always
//! included. Each dependency is refreshed to its latest published version;
//! when that differs from the version pinned at the baseline, the
//! dependency's history between the two version tags is included as well.
//! Any failure along the way aborts the whole diff.
use color_eyre::eyre::Context;
use regex::Regex;
use serde_json::Value;
use std::{path::Path, sync::LazyLock};

use crate::{
    changelog::{
        commit::{Commit, parse_log},
        types::{Baseline, DependencyRef, DependencyUpgrade, Project, ReleaseDiff},
    },
    error::ReleaseError,
    git::SourceControl,
    npm::{PACKAGE_JSON, PackageManager},
    progress::Progress,
    result::Result,
    version::{is_valid_version, latest_stable_tag},
};

static PINNED_VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").unwrap());

/// Which section of package.json a dependency is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DependencyKind {
    Runtime,
    Dev,
}

impl DependencyKind {
    fn manifest_key(&self) -> &'static str {
        match self {
            DependencyKind::Runtime => "dependencies",
            DependencyKind::Dev => "devDependencies",
        }
    }
}

/// Tag name for a version: `2.1.0` becomes `v2.1.0`. Anything that is not a
/// bare version (a tag or a commit hash) is returned unchanged.
pub fn version_ref(version: &str) -> String {
    if is_valid_version(version) && !version.starts_with('v') {
        format!("v{version}")
    } else {
        version.to_string()
    }
}

pub struct ReleaseDiffEngine<'a> {
    scm: &'a dyn SourceControl,
    pm: &'a dyn PackageManager,
    /// Cloned projects the diffed project may depend on.
    dependencies: &'a [Project],
}

impl<'a> ReleaseDiffEngine<'a> {
    pub fn new(
        scm: &'a dyn SourceControl,
        pm: &'a dyn PackageManager,
        dependencies: &'a [Project],
    ) -> Self {
        Self {
            scm,
            pm,
            dependencies,
        }
    }

    /// Resolve dependency versions and changes for `project`, filling in
    /// `project.changes`, and return the render-ready diff.
    pub fn compute(
        &self,
        project: &mut Project,
        progress: &Progress,
    ) -> Result<ReleaseDiff> {
        let dir = project.directory()?.to_path_buf();

        let baseline = self.resolve_baseline(&dir, progress)?;
        progress.info(format!("Last release was {}", baseline.reference()));

        self.resolve_dependency_versions(project, &dir, &baseline, progress)?;

        let commits = self.commit_log(&dir, baseline.reference(), "HEAD")?;
        progress.debug(format!(
            "found {} commits in {} since {}",
            commits.len(),
            project.name,
            baseline.reference()
        ));

        let mut upgrades = vec![];
        for dependency in project.all_dependencies() {
            if dependency.is_changed() {
                upgrades.push(self.upgrade_for(dependency, progress)?);
            }
        }

        project.changes = commits
            .iter()
            .cloned()
            .chain(upgrades.iter().flat_map(|u| u.commits.iter().cloned()))
            .collect();

        Ok(ReleaseDiff {
            project: project.name.clone(),
            repository_url: project.repository_url.clone(),
            baseline,
            commits,
            upgrades,
        })
    }

    fn resolve_baseline(
        &self,
        dir: &Path,
        progress: &Progress,
    ) -> Result<Baseline> {
        let tags = self.scm.list_tags(dir)?;

        if let Some(name) = latest_stable_tag(&tags) {
            let version = name.strip_prefix('v').unwrap_or(&name).to_string();
            return Ok(Baseline::Tag { name, version });
        }

        progress.info(
            "No tags were found. Using the first commit as the last release",
        );
        let hash = self.scm.first_commit(dir)?;

        if hash.is_empty() {
            return Err(ReleaseError::resolution(format!(
                "unable to find the first commit in {}",
                dir.display()
            ))
            .into());
        }

        Ok(Baseline::FirstCommit(hash))
    }

    fn resolve_dependency_versions(
        &self,
        project: &mut Project,
        dir: &Path,
        baseline: &Baseline,
        progress: &Progress,
    ) -> Result<()> {
        progress.info(format!(
            "installing {} dependencies and {} devDependencies",
            project.dependencies.len(),
            project.dev_dependencies.len()
        ));

        if project.dependencies.is_empty() && project.dev_dependencies.is_empty()
        {
            return Ok(());
        }

        let manifest = self.manifest_at(dir, baseline)?;
        let progress = progress.nested();

        for dependency in project.dependencies.iter_mut() {
            self.resolve_dependency(
                dependency,
                DependencyKind::Runtime,
                &manifest,
                dir,
                &progress,
            )?;
        }

        for dependency in project.dev_dependencies.iter_mut() {
            self.resolve_dependency(
                dependency,
                DependencyKind::Dev,
                &manifest,
                dir,
                &progress,
            )?;
        }

        Ok(())
    }

    fn resolve_dependency(
        &self,
        dependency: &mut DependencyRef,
        kind: DependencyKind,
        manifest: &Value,
        dir: &Path,
        progress: &Progress,
    ) -> Result<()> {
        let npm_name = self.dependency(&dependency.name)?.npm_name.clone();

        let previous = pinned_version(manifest, kind, &npm_name)?;

        self.pm
            .install_latest(dir, &npm_name, kind == DependencyKind::Dev)
            .wrap_err_with(|| format!("failed to install {npm_name}@latest"))?;

        let new = self.pm.installed_version(dir, &npm_name)?;

        if previous != new {
            progress.info(format!("Updated {npm_name} from {previous} to {new}"));
        } else {
            progress.debug(format!("{npm_name} is unchanged at {new}"));
        }

        dependency.previous_release_version = Some(previous);
        dependency.new_version = Some(new);

        Ok(())
    }

    /// package.json as it existed at the baseline.
    fn manifest_at(&self, dir: &Path, baseline: &Baseline) -> Result<Value> {
        let reference = baseline.reference();

        let content = self
            .scm
            .show_file(dir, reference, PACKAGE_JSON)
            .map_err(|e| {
                ReleaseError::resolution(format!(
                    "unable to read {PACKAGE_JSON} at {reference}: {e}"
                ))
            })?;

        let manifest = serde_json::from_str(&content).map_err(|e| {
            ReleaseError::resolution(format!(
                "unable to parse {PACKAGE_JSON} at {reference}: {e}"
            ))
        })?;

        Ok(manifest)
    }

    fn upgrade_for(
        &self,
        dependency: &DependencyRef,
        progress: &Progress,
    ) -> Result<DependencyUpgrade> {
        let project = self.dependency(&dependency.name)?;
        let dir = project.directory()?;

        let (Some(previous), Some(new)) =
            (&dependency.previous_release_version, &dependency.new_version)
        else {
            return Err(ReleaseError::resolution(format!(
                "versions of {} were not resolved",
                dependency.name
            ))
            .into());
        };

        let new_tag = version_ref(new);
        let commits = self.commit_log(dir, &version_ref(previous), &new_tag)?;

        let release_date =
            self.scm.tag_date(dir, &new_tag)?.ok_or_else(|| {
                ReleaseError::resolution(format!(
                    "tag {new_tag} not found in {}",
                    project.name
                ))
            })?;

        progress.debug(format!(
            "{} commits in {} between {previous} and {new}",
            commits.len(),
            project.name
        ));

        Ok(DependencyUpgrade {
            name: project.name.clone(),
            repository_url: project.repository_url.clone(),
            previous_version: previous.clone(),
            new_version: new.clone(),
            release_date,
            commits,
        })
    }

    fn commit_log(&self, dir: &Path, from: &str, to: &str) -> Result<Vec<Commit>> {
        let raw = self.scm.log_first_parent(dir, from, to)?;
        Ok(parse_log(&raw))
    }

    fn dependency(&self, name: &str) -> Result<&'a Project> {
        self.dependencies
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                ReleaseError::resolution(format!(
                    "dependency {name} has not been cloned"
                ))
                .into()
            })
    }
}

/// Version of `npm_name` pinned in `manifest` under the section for `kind`,
/// reduced to `major.minor.patch`.
fn pinned_version(
    manifest: &Value,
    kind: DependencyKind,
    npm_name: &str,
) -> Result<String> {
    let key = kind.manifest_key();

    let range = manifest
        .get(key)
        .and_then(|deps| deps.get(npm_name))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ReleaseError::resolution(format!(
                "{npm_name} is not listed in {key} of the previous release"
            ))
        })?;

    PINNED_VERSION_REGEX
        .find(range)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            ReleaseError::resolution(format!(
                "unable to read a version for {npm_name} from \"{range}\""
            ))
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{git::MockSourceControl, npm::MockPackageManager};
    use std::path::PathBuf;

    fn cloned(name: &str, deps: &[&str], dev_deps: &[&str]) -> Project {
        Project {
            name: name.into(),
            npm_name: name.into(),
            repository_url: format!("https://github.com/org/{name}"),
            directory: Some(PathBuf::from(format!("/clones/{name}"))),
            dependencies: deps.iter().map(|d| DependencyRef::new(*d)).collect(),
            dev_dependencies: dev_deps
                .iter()
                .map(|d| DependencyRef::new(*d))
                .collect(),
            changes: vec![],
        }
    }

    fn resolution_message(err: &color_eyre::Report) -> String {
        match err.downcast_ref::<ReleaseError>() {
            Some(ReleaseError::Resolution(msg)) => msg.clone(),
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[test]
    fn version_ref_prefixes_bare_versions_only() {
        assert_eq!(version_ref("2.1.0"), "v2.1.0");
        assert_eq!(version_ref("v2.1.0"), "v2.1.0");
        assert_eq!(version_ref("abc123"), "abc123");
    }

    #[test]
    fn pinned_version_strips_range_operators() {
        let manifest: Value = serde_json::from_str(
            r#"{"dependencies":{"lib":"^2.0.0"},"devDependencies":{"tool":"~1.4.3-beta"}}"#,
        )
        .unwrap();
        assert_eq!(
            pinned_version(&manifest, DependencyKind::Runtime, "lib").unwrap(),
            "2.0.0"
        );
        assert_eq!(
            pinned_version(&manifest, DependencyKind::Dev, "tool").unwrap(),
            "1.4.3"
        );
        assert!(pinned_version(&manifest, DependencyKind::Dev, "lib").is_err());
    }

    #[test]
    fn collects_own_and_upgraded_dependency_commits() {
        let mut project = cloned("app", &["lib"], &[]);
        let deps = vec![cloned("lib", &[], &[])];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags()
            .returning(|_| Ok(vec!["v0.9.0".into(), "v1.0.0".into()]));
        scm.expect_show_file()
            .withf(|dir, rev, path| {
                dir == Path::new("/clones/app")
                    && rev == "v1.0.0"
                    && path == "package.json"
            })
            .returning(|_, _, _| Ok(r#"{"dependencies":{"lib":"^2.0.0"}}"#.into()));
        scm.expect_log_first_parent()
            .withf(|dir, from, to| {
                dir == Path::new("/clones/app") && from == "v1.0.0" && to == "HEAD"
            })
            .returning(|_, _, _| {
                Ok("def456 feat: thing (#42)\nabc123 fix: bug".into())
            });
        scm.expect_log_first_parent()
            .withf(|dir, from, to| {
                dir == Path::new("/clones/lib") && from == "v2.0.0" && to == "v2.1.0"
            })
            .returning(|_, _, _| Ok("aaa111 2.1.0\nbbb222 feat: lib change (#5)".into()));
        scm.expect_tag_date()
            .withf(|dir, tag| dir == Path::new("/clones/lib") && tag == "v2.1.0")
            .returning(|_, _| Ok(Some("2024-05-02".into())));

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest()
            .withf(|dir, pkg, dev| {
                dir == Path::new("/clones/app") && pkg == "lib" && !dev
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        pm.expect_installed_version()
            .returning(|_, _| Ok("2.1.0".into()));

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        let diff = engine.compute(&mut project, &Progress::root()).unwrap();

        assert_eq!(
            diff.baseline,
            Baseline::Tag {
                name: "v1.0.0".into(),
                version: "1.0.0".into()
            }
        );
        assert_eq!(diff.commits.len(), 2);
        assert_eq!(diff.upgrades.len(), 1);

        let upgrade = &diff.upgrades[0];
        assert_eq!(upgrade.previous_version, "2.0.0");
        assert_eq!(upgrade.new_version, "2.1.0");
        assert_eq!(upgrade.release_date, "2024-05-02");
        assert_eq!(upgrade.commits.len(), 1);
        assert_eq!(upgrade.commits[0].message, "feat: lib change");

        let hashes = project
            .changes
            .iter()
            .map(|c| c.hash.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(hashes, vec!["def456", "abc123", "bbb222"]);

        assert_eq!(
            project.dependencies[0].previous_release_version.as_deref(),
            Some("2.0.0")
        );
        assert_eq!(project.dependencies[0].new_version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn unchanged_dependencies_contribute_nothing() {
        let mut project = cloned("app", &[], &["lint"]);
        let deps = vec![cloned("lint", &[], &[])];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags().returning(|_| Ok(vec!["v1.0.0".into()]));
        scm.expect_show_file().returning(|_, _, _| {
            Ok(r#"{"devDependencies":{"lint":"^3.1.0"}}"#.into())
        });
        scm.expect_log_first_parent()
            .times(1)
            .returning(|_, _, _| Ok(String::new()));
        scm.expect_tag_date().never();

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest()
            .withf(|_, pkg, dev| pkg == "lint" && *dev)
            .returning(|_, _, _| Ok(()));
        pm.expect_installed_version()
            .returning(|_, _| Ok("3.1.0".into()));

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        let diff = engine.compute(&mut project, &Progress::root()).unwrap();

        assert!(diff.commits.is_empty());
        assert!(diff.upgrades.is_empty());
        assert!(project.changes.is_empty());
    }

    #[test]
    fn reads_manifest_at_tag_without_v_prefix() {
        let mut project = cloned("app", &["lib"], &[]);
        let deps = vec![cloned("lib", &[], &[])];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags()
            .withf(|dir| dir == Path::new("/clones/app"))
            .returning(|_| Ok(vec!["0.9.0".into(), "1.0.0".into()]));
        scm.expect_show_file()
            .withf(|dir, rev, path| {
                dir == Path::new("/clones/app") && rev == "1.0.0" && path == "package.json"
            })
            .times(1)
            .returning(|_, _, _| Ok(r#"{"dependencies":{"lib":"2.0.0"}}"#.into()));
        scm.expect_log_first_parent()
            .withf(|_, from, to| from == "1.0.0" && to == "HEAD")
            .times(1)
            .returning(|_, _, _| Ok("abc123 fix: bug".into()));
        scm.expect_tag_date().never();

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest().returning(|_, _, _| Ok(()));
        pm.expect_installed_version()
            .returning(|_, _| Ok("2.0.0".into()));

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        let diff = engine.compute(&mut project, &Progress::root()).unwrap();

        assert_eq!(
            diff.baseline,
            Baseline::Tag {
                name: "1.0.0".into(),
                version: "1.0.0".into()
            }
        );
        assert_eq!(diff.commits.len(), 1);
        assert_eq!(
            project.dependencies[0].previous_release_version.as_deref(),
            Some("2.0.0")
        );
    }

    #[test]
    fn falls_back_to_first_commit_without_tags() {
        let mut project = cloned("app", &[], &[]);

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags()
            .returning(|_| Ok(vec!["nightly".into(), "v2.0.0-beta.1".into()]));
        scm.expect_first_commit()
            .returning(|_| Ok("0f0f0f0".into()));
        scm.expect_log_first_parent()
            .withf(|_, from, to| from == "0f0f0f0" && to == "HEAD")
            .returning(|_, _, _| Ok("abc123 feat: first feature".into()));

        let pm = MockPackageManager::new();

        let engine = ReleaseDiffEngine::new(&scm, &pm, &[]);
        let diff = engine.compute(&mut project, &Progress::root()).unwrap();

        assert_eq!(diff.baseline, Baseline::FirstCommit("0f0f0f0".into()));
        assert_eq!(project.changes.len(), 1);
    }

    #[test]
    fn unreadable_historical_manifest_aborts() {
        let mut project = cloned("app", &["lib"], &[]);
        let deps = vec![cloned("lib", &[], &[])];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags().returning(|_| Ok(vec!["v1.0.0".into()]));
        scm.expect_show_file().returning(|_, _, _| {
            Err(color_eyre::eyre::eyre!(
                "fatal: path 'package.json' does not exist in 'v1.0.0'"
            ))
        });
        scm.expect_log_first_parent().never();

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest().never();

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        let err = engine.compute(&mut project, &Progress::root()).unwrap_err();

        assert!(resolution_message(&err).contains("unable to read package.json"));
        assert!(project.changes.is_empty());
    }

    #[test]
    fn failed_install_aborts() {
        let mut project = cloned("app", &["lib"], &[]);
        let deps = vec![cloned("lib", &[], &[])];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags().returning(|_| Ok(vec!["v1.0.0".into()]));
        scm.expect_show_file()
            .returning(|_, _, _| Ok(r#"{"dependencies":{"lib":"2.0.0"}}"#.into()));

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest().returning(|_, _, _| {
            Err(color_eyre::eyre::eyre!("npm ERR! 404 Not Found"))
        });

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        assert!(engine.compute(&mut project, &Progress::root()).is_err());
    }

    #[test]
    fn missing_dependency_tag_aborts() {
        let mut project = cloned("app", &["lib"], &[]);
        let deps = vec![cloned("lib", &[], &[])];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags().returning(|_| Ok(vec!["v1.0.0".into()]));
        scm.expect_show_file()
            .returning(|_, _, _| Ok(r#"{"dependencies":{"lib":"2.0.0"}}"#.into()));
        scm.expect_log_first_parent()
            .returning(|_, _, _| Ok(String::new()));
        scm.expect_tag_date().returning(|_, _| Ok(None));

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest().returning(|_, _, _| Ok(()));
        pm.expect_installed_version()
            .returning(|_, _| Ok("2.1.0".into()));

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        let err = engine.compute(&mut project, &Progress::root()).unwrap_err();
        assert!(resolution_message(&err).contains("tag v2.1.0 not found"));
    }

    #[test]
    fn uses_npm_name_of_dependency() {
        let mut project = cloned("app", &[], &["bslint"]);
        let mut bslint = cloned("bslint", &[], &[]);
        bslint.npm_name = "@scope/bslint".into();
        let deps = vec![bslint];

        let mut scm = MockSourceControl::new();
        scm.expect_list_tags().returning(|_| Ok(vec!["v1.0.0".into()]));
        scm.expect_show_file().returning(|_, _, _| {
            Ok(r#"{"devDependencies":{"@scope/bslint":"^0.8.1"}}"#.into())
        });
        scm.expect_log_first_parent()
            .returning(|_, _, _| Ok(String::new()));

        let mut pm = MockPackageManager::new();
        pm.expect_install_latest()
            .withf(|_, pkg, _| pkg == "@scope/bslint")
            .returning(|_, _, _| Ok(()));
        pm.expect_installed_version()
            .withf(|_, pkg| pkg == "@scope/bslint")
            .returning(|_, _| Ok("0.8.1".into()));

        let engine = ReleaseDiffEngine::new(&scm, &pm, &deps);
        engine.compute(&mut project, &Progress::root()).unwrap();

        assert_eq!(
            project.dev_dependencies[0].previous_release_version.as_deref(),
            Some("0.8.1")
        );
    }

    #[test]
    fn uncloned_project_is_an_error() {
        let mut project = cloned("app", &[], &[]);
        project.directory = None;

        let scm = MockSourceControl::new();
        let pm = MockPackageManager::new();
        let engine = ReleaseDiffEngine::new(&scm, &pm, &[]);
        assert!(engine.compute(&mut project, &Progress::root()).is_err());
    }
}
